use std::fmt::{Display, Formatter};

use serde_json::Value;

/// A single store operation: a lowercase operation name plus positional
/// arguments. For key-addressed operations the full key path is the first
/// argument, the way a store server would receive it.
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    op: String,
    args: Vec<Value>,
}

impl Command {
    /// Start a command. The operation name is normalized to lowercase.
    pub fn new(op: impl AsRef<str>) -> Self {
        Command {
            op: op.as_ref().to_ascii_lowercase(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<Value>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn op(&self) -> &str {
        &self.op
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.op)?;
        for arg in &self.args {
            match arg {
                Value::String(s) => write!(f, " {s}")?,
                other => write!(f, " {other}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Command;

    #[test]
    fn test_op_is_lowercased() {
        assert_eq!(Command::new("GET").op(), "get");
    }

    #[test]
    fn test_args_keep_order() {
        let command = Command::new("set").arg("nest-test:getset").arg(1);

        assert_eq!(command.args().len(), 2);
        assert_eq!(command.args()[0], "nest-test:getset");
        assert_eq!(command.args()[1], 1);
    }

    #[test]
    fn test_display_renders_like_a_server_log() {
        let command = Command::new("set").arg("nest-test").arg(2345);

        assert_eq!(command.to_string(), "set nest-test 2345");
    }
}
