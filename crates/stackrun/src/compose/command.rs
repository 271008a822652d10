use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Service `command`: either a string split like a shell would, or an exec list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StartupCommand {
  Shell(String),
  Exec(Vec<String>),
}

/// Sub-commands of a `&&` chain, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandChain {
  links: Vec<Vec<String>>,
}

impl CommandChain {
  pub fn links(&self) -> &[Vec<String>] {
    &self.links
  }

  pub fn len(&self) -> usize {
    self.links.len()
  }

  pub fn is_empty(&self) -> bool {
    self.links.is_empty()
  }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
  Word(String),
  Operator(&'static str),
}

const SHELLS: [&str; 5] = ["sh", "bash", "ash", "dash", "zsh"];

/// `-c`, or short flags combined with it such as `-ec` or `-xec`.
fn is_command_flag(arg: &str) -> bool {
  match arg.strip_prefix('-') {
    Some(flags) => {
      flags.ends_with('c') && flags.chars().all(|flag| flag.is_ascii_alphabetic())
    }
    None => false,
  }
}

impl StartupCommand {
  pub fn argv(&self) -> Result<Vec<String>> {
    match self {
      StartupCommand::Exec(argv) => Ok(argv.clone()),
      // The engine does not run a shell here, operators are plain arguments
      StartupCommand::Shell(command) => Ok(
        tokenize(command)?
          .into_iter()
          .map(|token| match token {
            Token::Word(word) => word,
            Token::Operator(op) => op.to_string(),
          })
          .collect(),
      ),
    }
  }

  /// The script handed to `sh -c`, if the command wraps one.
  pub fn shell_script(&self) -> Result<Option<String>> {
    let argv = self.argv()?;
    if argv.len() < 3 || !is_command_flag(&argv[1]) {
      return Ok(None);
    }

    let program = argv[0].rsplit('/').next().unwrap_or(&argv[0]);
    if !SHELLS.contains(&program) {
      return Ok(None);
    }

    Ok(Some(argv[2].clone()))
  }

  pub fn chain(&self) -> Result<CommandChain> {
    let script = match self.shell_script()? {
      Some(script) => script,
      None => {
        return Ok(CommandChain {
          links: vec![self.argv()?],
        })
      }
    };

    let mut links = vec![];
    let mut current = vec![];

    for token in tokenize(&script)? {
      match token {
        Token::Word(word) => current.push(word),
        Token::Operator("&&") => {
          if current.is_empty() {
            return Err(Error::config_error(format!(
              "Empty command in `&&` chain: {}",
              script.trim()
            )));
          }
          links.push(std::mem::take(&mut current));
        }
        Token::Operator(op) => {
          return Err(Error::unsupported_feature(format!(
            "Only `&&` chains are supported in service commands, found `{}`",
            op
          )));
        }
      }
    }

    if current.is_empty() {
      return Err(Error::config_error(format!(
        "Empty command in `&&` chain: {}",
        script.trim()
      )));
    }
    links.push(current);

    Ok(CommandChain { links })
  }
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
  let mut tokens = vec![];
  let mut word = String::new();
  let mut in_word = false;
  let mut chars = input.chars().peekable();

  let flush = |tokens: &mut Vec<Token>, word: &mut String, in_word: &mut bool| {
    if *in_word {
      tokens.push(Token::Word(std::mem::take(word)));
      *in_word = false;
    }
  };

  while let Some(c) = chars.next() {
    match c {
      c if c.is_whitespace() => flush(&mut tokens, &mut word, &mut in_word),
      '\'' => {
        in_word = true;
        loop {
          match chars.next() {
            Some('\'') => break,
            Some(c) => word.push(c),
            None => return Err(Error::config_error("Unterminated single quote in command")),
          }
        }
      }
      '"' => {
        in_word = true;
        loop {
          match chars.next() {
            Some('"') => break,
            Some('\\') => match chars.next() {
              Some(c @ ('"' | '\\' | '$' | '`')) => word.push(c),
              Some('\n') => {}
              Some(c) => {
                word.push('\\');
                word.push(c);
              }
              None => return Err(Error::config_error("Unterminated double quote in command")),
            },
            Some(c) => word.push(c),
            None => return Err(Error::config_error("Unterminated double quote in command")),
          }
        }
      }
      '\\' => match chars.next() {
        Some('\n') => {}
        Some(c) => {
          in_word = true;
          word.push(c);
        }
        None => return Err(Error::config_error("Trailing backslash in command")),
      },
      '&' | '|' | ';' => {
        flush(&mut tokens, &mut word, &mut in_word);
        let next = chars.peek().copied();
        let op = match (c, next) {
          ('&', Some('&')) => {
            chars.next();
            "&&"
          }
          ('|', Some('|')) => {
            chars.next();
            "||"
          }
          ('&', _) => "&",
          ('|', _) => "|",
          _ => ";",
        };
        tokens.push(Token::Operator(op));
      }
      c => {
        in_word = true;
        word.push(c);
      }
    }
  }

  flush(&mut tokens, &mut word, &mut in_word);

  Ok(tokens)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn test_argv_quotes() {
    let command = StartupCommand::Shell(r#"echo 'a b' "c \"d\"" e\ f """#.to_string());

    assert_eq!(
      command.argv().unwrap(),
      words(&["echo", "a b", "c \"d\"", "e f", ""])
    );
  }

  #[test]
  fn test_unterminated_quote() {
    let command = StartupCommand::Shell("sh -c \"echo hi".to_string());

    assert_eq!(
      command.argv().unwrap_err(),
      Error::config_error("Unterminated double quote in command")
    );
  }

  #[test]
  fn test_chain_of_three() {
    let command = StartupCommand::Shell(
      "sh -c \"python manage.py wait_for_db &&\n       python manage.py migrate &&\n       python manage.py runserver 0.0.0.0:8000\"\n"
        .to_string(),
    );

    let chain = command.chain().unwrap();

    assert_eq!(chain.len(), 3);
    assert_eq!(
      chain.links()[0],
      words(&["python", "manage.py", "wait_for_db"])
    );
    assert_eq!(chain.links()[1], words(&["python", "manage.py", "migrate"]));
    assert_eq!(
      chain.links()[2],
      words(&["python", "manage.py", "runserver", "0.0.0.0:8000"])
    );
  }

  #[test]
  fn test_exec_form_with_shell() {
    let command = StartupCommand::Exec(words(&["/bin/bash", "-c", "make build && make test"]));

    assert_eq!(command.chain().unwrap().len(), 2);
  }

  #[test]
  fn test_combined_shell_flags() {
    let command = StartupCommand::Shell("sh -ec \"migrate && serve\"".to_string());

    assert_eq!(
      command.shell_script().unwrap().as_deref(),
      Some("migrate && serve")
    );
    assert_eq!(command.chain().unwrap().len(), 2);

    let command = StartupCommand::Exec(words(&["bash", "-xec", "a && b && c"]));
    assert_eq!(command.chain().unwrap().len(), 3);

    for flags in ["-e", "--c", "-c1", "-"] {
      let command = StartupCommand::Exec(words(&["sh", flags, "a && b"]));
      assert_eq!(command.shell_script().unwrap(), None, "{}", flags);
    }
  }

  #[test]
  fn test_chain_without_shell() {
    let command = StartupCommand::Shell("python manage.py runserver".to_string());

    let chain = command.chain().unwrap();
    assert_eq!(chain.len(), 1);
    assert_eq!(command.shell_script().unwrap(), None);
  }

  #[test]
  fn test_chain_rejects_other_operators() {
    let command = StartupCommand::Shell("sh -c 'migrate || true'".to_string());

    assert_eq!(
      command.chain().unwrap_err(),
      Error::unsupported_feature(
        "Only `&&` chains are supported in service commands, found `||`"
      )
    );
  }

  #[test]
  fn test_chain_rejects_empty_link() {
    let command = StartupCommand::Shell("sh -c 'migrate && '".to_string());

    assert!(command.chain().is_err());
  }

  #[test]
  fn test_deserialize_forms() {
    let command: StartupCommand = serde_yaml::from_str("python app.py").unwrap();
    assert_eq!(command, StartupCommand::Shell("python app.py".to_string()));

    let command: StartupCommand = serde_yaml::from_str("[python, app.py]").unwrap();
    assert_eq!(command, StartupCommand::Exec(words(&["python", "app.py"])));
  }
}
