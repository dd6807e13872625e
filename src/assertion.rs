//! Engine assertion rendezvous.
//!
//! A failed assertion on the engine thread posts an [`AssertionRequest`] to the UI and blocks on
//! its one-shot reply channel until the user picks an [`AssertionChoice`].

use std::collections::HashSet;
use std::fmt;
use std::sync::mpsc;

use crate::console::LogChannel;
use crate::events::{EditorEvent, EventSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertionChoice {
    Continue,
    /// Suppress further prompts from the same location.
    Ignore,
    /// Suppress every further prompt for this session.
    IgnoreAll,
    Break,
}

pub struct AssertionRequest {
    pub test: String,
    pub file: String,
    pub line: u32,
    pub message: String,
    reply: mpsc::SyncSender<AssertionChoice>,
}

impl fmt::Debug for AssertionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssertionRequest")
            .field("test", &self.test)
            .field("file", &self.file)
            .field("line", &self.line)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

impl AssertionRequest {
    pub fn respond(self, choice: AssertionChoice) {
        // The engine may have been torn down while the dialog was open.
        let _ = self.reply.send(choice);
    }
}

/// UI side decision maker, typically a modal dialog.
pub trait AssertionPrompt {
    fn ask(&mut self, request: &AssertionRequest) -> AssertionChoice;
}

impl<F> AssertionPrompt for F
where
    F: FnMut(&AssertionRequest) -> AssertionChoice,
{
    fn ask(&mut self, request: &AssertionRequest) -> AssertionChoice {
        self(request)
    }
}

/// Engine side of the rendezvous.
#[derive(Debug)]
pub struct AssertionBridge {
    events: EventSender,
    ignore_all: bool,
    ignored: HashSet<(String, u32)>,
}

impl AssertionBridge {
    pub fn new(events: EventSender) -> Self {
        Self { events, ignore_all: false, ignored: HashSet::new() }
    }

    /// Reports a failed assertion and blocks until the UI answers. Returns `Break` if the UI
    /// dropped the request without answering.
    pub fn raise(&mut self, test: &str, file: &str, line: u32, message: &str) -> AssertionChoice {
        self.events.log(LogChannel::Assert, format!("{file}({line}): assertion failed: {test} {message}"));
        if self.ignore_all || self.ignored.contains(&(file.to_string(), line)) {
            return AssertionChoice::Ignore;
        }
        let (reply, answer) = mpsc::sync_channel(1);
        self.events.send(EditorEvent::Assertion(AssertionRequest {
            test: test.to_string(),
            file: file.to_string(),
            line,
            message: message.to_string(),
            reply,
        }));
        let choice = answer.recv().unwrap_or(AssertionChoice::Break);
        match choice {
            AssertionChoice::Ignore => {
                self.ignored.insert((file.to_string(), line));
            }
            AssertionChoice::IgnoreAll => self.ignore_all = true,
            AssertionChoice::Continue | AssertionChoice::Break => {}
        }
        choice
    }
}
