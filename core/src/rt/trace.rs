use std::fmt::Write as _;
use std::sync::Arc;

/// One live frame on the call stack.
///
/// `call_line` is the line in the *caller* where this call happened; a
/// frame's own executing line is recorded by the frame pushed on top of it
/// (or by the context's current line for the innermost frame).
#[derive(Debug, Clone)]
pub struct CallFrameInfo {
    pub name: Arc<str>,
    pub call_line: u32,
    pub native: bool,
    /// Synthetic adapter frames are invisible in tracebacks. Their
    /// `call_line` still participates in line attribution for the frames
    /// below them.
    pub elided: bool,
}

impl CallFrameInfo {
    pub fn script(name: Arc<str>, call_line: u32) -> Self {
        Self {
            name,
            call_line,
            native: false,
            elided: false,
        }
    }

    pub fn native(name: Arc<str>, call_line: u32) -> Self {
        Self {
            name,
            call_line,
            native: true,
            elided: false,
        }
    }

    pub fn elided(name: Arc<str>, call_line: u32) -> Self {
        Self {
            name,
            call_line,
            native: false,
            elided: true,
        }
    }
}

/// A resolved traceback entry: elision already applied, lines attributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TracebackFrame {
    Native { name: Arc<str> },
    Script { name: Arc<str>, line: u32 },
    Main { line: u32 },
}

/// Snapshot the visible traceback, innermost frame first.
pub fn capture(current_line: u32, stack: &[CallFrameInfo]) -> Vec<TracebackFrame> {
    let mut frames = Vec::with_capacity(stack.len() + 1);
    let mut exec_line = current_line;
    for frame in stack.iter().rev() {
        if !frame.elided {
            frames.push(if frame.native {
                TracebackFrame::Native {
                    name: frame.name.clone(),
                }
            } else {
                TracebackFrame::Script {
                    name: frame.name.clone(),
                    line: exec_line,
                }
            });
        }
        exec_line = frame.call_line;
    }
    frames.push(TracebackFrame::Main { line: exec_line });
    frames
}

pub fn render(chunk: &str, frames: &[TracebackFrame]) -> String {
    let mut out = String::from("stack traceback:");
    for frame in frames {
        out.push_str("\n\t");
        match frame {
            TracebackFrame::Native { name } => {
                let _ = write!(out, "[C]: in function '{}'", name);
            }
            TracebackFrame::Script { name, line } => {
                let _ = write!(out, "{}:{}: in function '{}'", chunk, line, name);
            }
            TracebackFrame::Main { line } => {
                let _ = write!(out, "{}:{}: in main chunk", chunk, line);
            }
        }
    }
    out
}
