use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use codespan_reporting::term::termcolor::WriteColor;
use navigator::{Event, NavigationState, Navigator, NavigatorConfig};

use crate::error::{CliError, read_source};
use crate::terminal;

const HELP: &str = "[n] follow link n  [b] back  [r] reload  [q] quit";

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Follow(usize),
    Back,
    Reload,
    Quit,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    match line {
        "b" => Input::Back,
        "r" => Input::Reload,
        "q" => Input::Quit,
        _ => match line.parse::<usize>() {
            Ok(n) => Input::Follow(n),
            Err(_) => Input::Unknown(line.to_string()),
        },
    }
}

/// An interactive reading session over one file. Back history is kept here
/// as snapshots of the navigation state.
pub struct Session {
    path: PathBuf,
    navigator: Navigator,
    history: Vec<NavigationState>,
    width: usize,
}

impl Session {
    pub fn open(path: &Path, config: NavigatorConfig, width: usize) -> Result<Self, CliError> {
        let source = read_source(path)?;
        Ok(Session {
            path: path.to_path_buf(),
            navigator: Navigator::from_source(source, config),
            history: Vec::new(),
            width,
        })
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Read commands from `input` until `q` or end of input.
    pub fn run<R: BufRead, W: WriteColor>(
        &mut self,
        input: R,
        out: &mut W,
    ) -> Result<(), CliError> {
        self.show(out)?;
        for line in input.lines() {
            match parse_input(&line?) {
                Input::Quit => break,
                Input::Follow(n) => self.follow(n, out)?,
                Input::Back => self.back(out)?,
                Input::Reload => self.reload(out)?,
                Input::Unknown(text) => writeln!(out, "unknown command '{}'. {}", text, HELP)?,
            }
        }
        Ok(())
    }

    fn follow<W: WriteColor>(&mut self, n: usize, out: &mut W) -> Result<(), CliError> {
        let model = self.navigator.render();
        let Some(link) = n.checked_sub(1).and_then(|i| model.links().get(i).copied()) else {
            writeln!(out, "no link {} on this card", n)?;
            return Ok(());
        };
        let event = link.activate();
        self.history.push(self.navigator.state().clone());
        self.navigator.dispatch(event);
        self.show(out)
    }

    fn back<W: WriteColor>(&mut self, out: &mut W) -> Result<(), CliError> {
        match self.history.pop() {
            Some(state) => {
                self.navigator.restore(state);
                self.show(out)
            }
            None => {
                writeln!(out, "already at the first card")?;
                Ok(())
            }
        }
    }

    /// Re-read the file. History is dropped since it refers to the old text.
    fn reload<W: WriteColor>(&mut self, out: &mut W) -> Result<(), CliError> {
        let source = read_source(&self.path)?;
        self.history.clear();
        self.navigator.dispatch(Event::LoadDocument(source));
        self.show(out)
    }

    fn show<W: WriteColor>(&self, out: &mut W) -> Result<(), CliError> {
        terminal::paint(out, &self.navigator.render(), self.width)?;
        writeln!(out, "{}", HELP)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use codespan_reporting::term::termcolor::NoColor;

    use super::*;

    const STORY: &str = "# The beginning\n[France](link \"france\")\n\n# france\n[Nowhere](link \"atlantis\")\n";

    fn session(source: &str) -> (tempfile::TempDir, Session) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story.md");
        std::fs::write(&path, source).unwrap();
        let session = Session::open(&path, NavigatorConfig::default(), 60).unwrap();
        (dir, session)
    }

    fn current(session: &Session) -> Option<String> {
        session
            .navigator()
            .current_section()
            .map(|section| section.label.display_title())
    }

    fn drive(session: &mut Session, input: &str) -> String {
        let mut out = NoColor::new(Vec::new());
        session.run(Cursor::new(input), &mut out).unwrap();
        String::from_utf8(out.into_inner()).unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_input("3\n"), Input::Follow(3));
        assert_eq!(parse_input(" b "), Input::Back);
        assert_eq!(parse_input("r"), Input::Reload);
        assert_eq!(parse_input("q"), Input::Quit);
        assert_eq!(parse_input("go"), Input::Unknown("go".into()));
    }

    #[test]
    fn follow_miss_and_back() {
        let (_dir, mut session) = session(STORY);
        drive(&mut session, "1\n");
        assert_eq!(current(&session).as_deref(), Some("france"));

        let output = drive(&mut session, "1\n");
        assert!(current(&session).is_none());
        assert!(output.contains("No section to show"));

        drive(&mut session, "b\n");
        assert_eq!(current(&session).as_deref(), Some("france"));
        drive(&mut session, "b\nb\n");
        assert_eq!(current(&session).as_deref(), Some("The beginning"));
    }

    #[test]
    fn out_of_range_link_is_reported() {
        let (_dir, mut session) = session(STORY);
        let output = drive(&mut session, "0\n7\n");
        assert!(output.contains("no link 0 on this card"));
        assert!(output.contains("no link 7 on this card"));
        assert_eq!(current(&session).as_deref(), Some("The beginning"));
    }

    #[test]
    fn quit_stops_reading() {
        let (_dir, mut session) = session(STORY);
        drive(&mut session, "q\n1\n");
        assert_eq!(current(&session).as_deref(), Some("The beginning"));
    }

    #[test]
    fn reload_picks_up_edits() {
        let (dir, mut session) = session(STORY);
        drive(&mut session, "1\n");
        std::fs::write(dir.path().join("story.md"), "# Intro\n\n# The beginning\nnew\n").unwrap();

        let output = drive(&mut session, "r\n");
        assert!(output.contains("new"));
        assert_eq!(session.navigator().document().sections.len(), 2);
        assert!(drive(&mut session, "b\n").contains("already at the first card"));
    }
}
