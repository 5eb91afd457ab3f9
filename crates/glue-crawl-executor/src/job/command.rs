//! `commandJobHandler`: run the job parameter as a command line.

use super::context::JobContext;
use super::JobHandler;
use async_trait::async_trait;
use tokio::process::Command;

/// `commandJobHandler`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandJobHandler;

impl CommandJobHandler {
    pub const NAME: &'static str = "commandJobHandler";
}

#[async_trait]
impl JobHandler for CommandJobHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn execute(&self, ctx: &mut JobContext) -> anyhow::Result<()> {
        let mut words = ctx.param().split_whitespace();
        let Some(program) = words.next() else {
            ctx.handle_fail(Some("command exit value(-1) is failed".to_string()));
            ctx.log("empty command");
            return Ok(());
        };
        let args: Vec<String> = words.map(str::to_string).collect();
        let program = program.to_string();

        let output = match Command::new(&program).args(&args).output().await {
            Ok(output) => output,
            Err(e) => {
                ctx.log(format!("failed to run {program}: {e}"));
                ctx.handle_fail(Some("command exit value(-1) is failed".to_string()));
                return Ok(());
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines().chain(stderr.lines()) {
            ctx.log(line.to_string());
        }

        let code = output.status.code().unwrap_or(-1);
        if code != 0 {
            ctx.handle_fail(Some(format!("command exit value({code}) is failed")));
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_logs_output_on_success() {
        let mut ctx = JobContext::new(CommandJobHandler::NAME, "echo hello crawler");
        CommandJobHandler.execute(&mut ctx).await.unwrap();
        assert!(ctx.is_success());
        assert_eq!(ctx.logs()[0].message, "hello crawler");
    }

    #[tokio::test]
    async fn test_non_zero_exit_fails() {
        let mut ctx = JobContext::new(CommandJobHandler::NAME, "false");
        CommandJobHandler.execute(&mut ctx).await.unwrap();
        assert!(!ctx.is_success());
        assert_eq!(
            ctx.result().message(),
            Some("command exit value(1) is failed")
        );
    }

    #[tokio::test]
    async fn test_missing_program_fails() {
        let mut ctx = JobContext::new(CommandJobHandler::NAME, "definitely-not-a-real-binary-xyz");
        CommandJobHandler.execute(&mut ctx).await.unwrap();
        assert!(!ctx.is_success());
    }
}
