use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use is_terminal::IsTerminal;

use crate::encoding::InputDecoder;
use crate::error::ShapeError;

pub const STDIN_MARKER: &str = "-";

/// Where one batch item reads its text from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl InputSource {
    pub fn from_arg(raw: &str) -> Self {
        if raw == STDIN_MARKER {
            InputSource::Stdin
        } else {
            InputSource::File(PathBuf::from(raw))
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            InputSource::Stdin => None,
            InputSource::File(path) => Some(path),
        }
    }

    pub fn is_stdin(&self) -> bool {
        matches!(self, InputSource::Stdin)
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Stdin => f.write_str(STDIN_MARKER),
            InputSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Parses an input list: one path per line, blank lines and `#` comments skipped.
pub fn parse_input_list(contents: &str) -> Vec<InputSource> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(InputSource::from_arg)
        .collect()
}

pub fn load_input_list(path: &Path) -> Result<Vec<InputSource>> {
    let contents = fs::read_to_string(path)
        .map_err(|err| ShapeError::io(format!("reading input list {}", path.display()), err))?;
    Ok(parse_input_list(&contents))
}

/// The list file replaces positional arguments; an empty result means stdin.
pub fn resolve_inputs(positional: &[String], list_file: Option<&Path>) -> Result<Vec<InputSource>> {
    let mut inputs = match list_file {
        Some(path) => load_input_list(path)?,
        None => positional.iter().map(|arg| InputSource::from_arg(arg)).collect(),
    };
    if inputs.is_empty() {
        inputs.push(InputSource::Stdin);
    }
    Ok(inputs)
}

/// The process's standard input. No lock is held between reads, so prompts
/// on the terminal stay independent of it.
pub struct StdinReader {
    reader: Box<dyn Read>,
    interactive: bool,
}

impl StdinReader {
    pub fn process() -> Self {
        let stdin = io::stdin();
        let interactive = stdin.is_terminal();
        Self {
            reader: Box::new(stdin),
            interactive,
        }
    }

    /// Treats `reader` as piped stdin.
    pub fn from_reader(reader: impl Read + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            interactive: false,
        }
    }

    /// Everything left on stdin, or nothing when stdin is an interactive
    /// terminal.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        if self.interactive {
            return Ok(bytes);
        }
        self.reader
            .read_to_end(&mut bytes)
            .map_err(|err| ShapeError::io("error reading input from stdin", err))?;
        Ok(bytes)
    }

    pub fn read_text(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

pub fn read_input(
    source: &InputSource,
    decoder: &InputDecoder,
    stdin: &mut StdinReader,
) -> Result<String> {
    let bytes = match source {
        InputSource::Stdin => stdin.read_bytes()?,
        InputSource::File(path) => fs::read(path).map_err(|err| {
            ShapeError::io(format!("error reading input file {}", path.display()), err)
        })?,
    };
    let decoded = decoder.decode(&bytes);
    log::debug!(
        "decoded {source} as {} via {}",
        decoded.encoding.name(),
        decoded.detected_by
    );
    if decoded.lossy {
        log::warn!("decoding errors encountered for {source}; continuing");
    }
    Ok(decoded.text)
}

/// True when stdin is a pipe that already holds data.
#[cfg(unix)]
pub fn stdin_has_piped_data() -> bool {
    fs::metadata("/dev/stdin")
        .map(|meta| is_pipe_with_data(&meta))
        .unwrap_or(false)
}

#[cfg(unix)]
fn is_pipe_with_data(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::FileTypeExt;

    meta.file_type().is_fifo() && meta.len() > 0
}

#[cfg(not(unix))]
pub fn stdin_has_piped_data() -> bool {
    false
}

pub fn read_prompt_file(path: &str, stdin: &mut StdinReader) -> Result<String> {
    if path == STDIN_MARKER {
        return stdin.read_text().context("reading prompt from stdin");
    }
    fs::read_to_string(path)
        .map_err(|err| ShapeError::io(format!("error reading prompt file {path}"), err).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn list_skips_blanks_and_comments() {
        let inputs = parse_input_list("a.txt\n\n# note\n  b.txt  \n-\n");
        assert_eq!(
            inputs,
            vec![
                InputSource::File("a.txt".into()),
                InputSource::File("b.txt".into()),
                InputSource::Stdin,
            ]
        );
    }

    #[test]
    fn no_inputs_means_stdin() {
        let inputs = resolve_inputs(&[], None).unwrap();
        assert_eq!(inputs, vec![InputSource::Stdin]);
    }

    #[test]
    fn list_file_replaces_positional_args() {
        let mut list = tempfile::NamedTempFile::new().unwrap();
        writeln!(list, "one.md\n#skip.md\ntwo.md").unwrap();
        let inputs = resolve_inputs(&["ignored.md".to_string()], Some(list.path())).unwrap();
        assert_eq!(
            inputs,
            vec![
                InputSource::File("one.md".into()),
                InputSource::File("two.md".into()),
            ]
        );
    }

    #[test]
    fn missing_list_file_is_io_error() {
        let err = load_input_list(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ShapeError>(),
            Some(ShapeError::Io { .. })
        ));
    }

    #[test]
    fn reads_file_input() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "A\nB\n").unwrap();
        let source = InputSource::File(file.path().to_path_buf());
        let mut stdin = StdinReader::from_reader(io::empty());
        let text = read_input(&source, &InputDecoder::default(), &mut stdin).unwrap();
        assert_eq!(text, "A\nB\n");
    }

    #[test]
    fn stdin_input_comes_from_the_reader() {
        let mut stdin = StdinReader::from_reader(&b"caf\xE9 au lait"[..]);
        let decoder = InputDecoder::new(Some("latin1")).unwrap();
        let text = read_input(&InputSource::Stdin, &decoder, &mut stdin).unwrap();
        assert_eq!(text, "caf\u{e9} au lait");
        // Drained: a second stdin item sees nothing.
        let again = read_input(&InputSource::Stdin, &decoder, &mut stdin).unwrap();
        assert_eq!(again, "");
    }

    #[test]
    fn prompt_dash_reads_stdin() {
        let mut stdin = StdinReader::from_reader(&b"summarize\n"[..]);
        assert_eq!(read_prompt_file("-", &mut stdin).unwrap(), "summarize\n");
    }

    #[test]
    fn display_uses_stdin_marker() {
        assert_eq!(InputSource::Stdin.to_string(), "-");
        assert_eq!(InputSource::from_arg("x/y.txt").to_string(), "x/y.txt");
    }

    #[cfg(unix)]
    #[test]
    fn redirected_file_and_empty_pipe_are_not_piped_data() {
        use std::process::{Command, Stdio};

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Hello").unwrap();
        assert!(!is_pipe_with_data(&fs::metadata(file.path()).unwrap()));

        let mut child = Command::new("true").stdout(Stdio::piped()).spawn().unwrap();
        let pipe = fs::File::from(std::os::fd::OwnedFd::from(child.stdout.take().unwrap()));
        child.wait().unwrap();
        let meta = pipe.metadata().unwrap();
        assert!(std::os::unix::fs::FileTypeExt::is_fifo(&meta.file_type()));
        assert!(!is_pipe_with_data(&meta));
    }
}
