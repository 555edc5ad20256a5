//! Part-of-speech tagging collaborator.
//!
//! The pipeline treats tagging as an opaque service: text in, tagged tokens out.
//! `ProcessTagger` talks to an external program over stdin/stdout.

use anyhow::{bail, Context, Result};
use std::io::{ErrorKind, Read, Write};
use std::process::{Command, Stdio};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaggedToken {
    pub text: String,
    pub tag: String,
}

impl TaggedToken {
    pub fn new(text: impl Into<String>, tag: impl Into<String>) -> Self {
        Self { text: text.into(), tag: tag.into() }
    }
}

pub trait Tagger {
    fn tag(&mut self, text: &str) -> Result<Vec<TaggedToken>>;
}

impl<F> Tagger for F
where
    F: FnMut(&str) -> Result<Vec<TaggedToken>>,
{
    fn tag(&mut self, text: &str) -> Result<Vec<TaggedToken>> {
        self(text)
    }
}

/// Runs `program args...` once per text. The text goes to the child's stdin;
/// the child prints one `token<TAB>tag` line per token.
#[derive(Clone, Debug)]
pub struct ProcessTagger {
    program: String,
    args: Vec<String>,
}

impl ProcessTagger {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Parse `program arg1 arg2` split on whitespace.
    pub fn from_command_line(cmd: &str) -> Result<Self> {
        let mut parts = cmd.split_whitespace();
        let Some(program) = parts.next() else { bail!("empty tagger command") };
        Ok(Self::new(program).args(parts))
    }
}

impl Tagger for ProcessTagger {
    fn tag(&mut self, text: &str) -> Result<Vec<TaggedToken>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("spawn tagger {}", self.program))?;

        // Feed stdin from a helper thread so a chatty child cannot deadlock us.
        let mut stdin = child.stdin.take().context("tagger stdin unavailable")?;
        let input = text.to_string();
        let feeder = std::thread::spawn(move || stdin.write_all(input.as_bytes()));

        let mut out = String::new();
        child
            .stdout
            .take()
            .context("tagger stdout unavailable")?
            .read_to_string(&mut out)
            .context("read tagger output")?;

        let status = child.wait().context("wait for tagger")?;
        match feeder.join() {
            // a child may stop reading early and still answer
            Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe && status.success() => {
                tracing::debug!(tagger = %self.program, "Tagger closed stdin before reading all input");
            }
            Ok(res) => res.context("write to tagger stdin")?,
            Err(_) => bail!("tagger stdin writer panicked"),
        }
        if !status.success() {
            bail!("tagger {} exited with {}", self.program, status);
        }

        Ok(out
            .lines()
            .filter_map(|l| {
                let (tok, tag) = l.split_once('\t')?;
                Some(TaggedToken::new(tok, tag.trim()))
            })
            .collect())
    }
}
