//! Adapters for the interactive capabilities the navigator relies on.
//! 導覽器所依賴的互動功能轉接層（選擇清單、開啟路徑、確認提示）。

use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};
use inquire::{Confirm, InquireError, Select};

/// Presents candidate names and returns the one the user picked.
/// 呈現候選名稱並回傳使用者選取的項目。
pub trait Chooser {
    /// `Ok(None)` means the user dismissed the prompt.
    fn choose(&self, prompt: &str, candidates: Vec<String>) -> Result<Option<String>>;
}

/// Fuzzy-filtered terminal list.
pub struct InquireChooser;

impl Chooser for InquireChooser {
    fn choose(&self, prompt: &str, candidates: Vec<String>) -> Result<Option<String>> {
        let answer = Select::new(prompt, candidates)
            .with_help_message("Type to filter, arrow keys to navigate, Enter to select")
            .prompt();
        match answer {
            Ok(choice) => Ok(Some(choice)),
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
            Err(InquireError::NotTTY) => {
                bail!("interactive selection requires a terminal; pass the name explicitly")
            }
            Err(err) => Err(anyhow!(err)),
        }
    }
}

/// Chooser that answers with a name given up front on the command line.
/// 以命令列預先指定的名稱作答的選擇器。
pub struct Preselected(pub String);

impl Chooser for Preselected {
    fn choose(&self, _prompt: &str, candidates: Vec<String>) -> Result<Option<String>> {
        if candidates.iter().any(|candidate| candidate == &self.0) {
            Ok(Some(self.0.clone()))
        } else {
            bail!(
                "'{}' is not one of: {}",
                self.0,
                candidates.join(", ")
            )
        }
    }
}

/// Opens a path for browsing or editing.
/// 開啟路徑以供瀏覽或編輯。
pub trait Opener {
    fn open(&self, path: &Path) -> Result<()>;
}

/// Hands the path to the platform's default handler.
pub struct SystemOpener;

impl Opener for SystemOpener {
    fn open(&self, path: &Path) -> Result<()> {
        open::that(path).with_context(|| format!("failed to open {}", path.display()))
    }
}

/// Runs a configured command with the path appended as its last argument.
/// 執行設定的指令，並將路徑附加為最後一個參數。
pub struct CommandOpener {
    program: String,
    args: Vec<String>,
}

impl CommandOpener {
    /// Splits on whitespace; single or double quotes keep spaces inside one
    /// argument (`open -a "Visual Studio Code"`). Backslashes are literal.
    pub fn parse(command: &str) -> Result<Self> {
        let mut parts = split_command(command)?.into_iter();
        let program = parts
            .next()
            .ok_or_else(|| anyhow!("opener command is empty"))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

fn split_command(command: &str) -> Result<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for ch in command.chars() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_token = true;
            }
            None if ch.is_whitespace() => {
                if in_token {
                    parts.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(ch);
                in_token = true;
            }
        }
    }
    if let Some(open) = quote {
        bail!("unterminated {open} quote in opener command: {command}");
    }
    if in_token {
        parts.push(current);
    }
    Ok(parts)
}

impl Opener for CommandOpener {
    fn open(&self, path: &Path) -> Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .status()
            .with_context(|| format!("failed to run opener '{}'", self.program))?;
        if !status.success() {
            bail!("opener '{}' exited with {status}", self.program);
        }
        Ok(())
    }
}

/// Writes the path to stdout so an editor can pick it up.
/// 將路徑輸出到標準輸出，供編輯器整合使用。
pub struct PrintOpener;

impl Opener for PrintOpener {
    fn open(&self, path: &Path) -> Result<()> {
        println!("{}", path.display());
        Ok(())
    }
}

/// Asks a yes/no question, defaulting to no. `assume_yes` skips the prompt.
/// 詢問是否確認，預設為否；`assume_yes` 會略過提示。
pub fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    match Confirm::new(prompt).with_default(false).prompt() {
        Ok(answer) => Ok(answer),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(false),
        Err(InquireError::NotTTY) => bail!("confirmation requires a terminal; pass --yes"),
        Err(err) => Err(anyhow!(err)),
    }
}
