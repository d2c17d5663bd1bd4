//! Interactive command parsing.

/// One line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Search(String),
    Browse(String),
    Http(String),
    Context(String),
    Memory(MemoryView),
    Clear,
    Help,
    Exit,
    /// Anything else goes to the provider.
    Chat(String),
    /// A known command missing its argument.
    Usage(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryView {
    Stats,
    Documents,
    Metadata,
    Tools,
    Messages,
    Search(String),
}

pub const HELP: &str = "\
  search <query>      Search the web and remember the results
  browse <url>        Fetch a page's readable text
  http <url>          Issue a raw GET request
  context <query>     Research a query and show the assembled context
  memory [view]       Inspect memory: documents, metadata, tools, messages, search <query>
  clear               Forget everything in this session
  help                Show this help
  exit                Leave the session

  Anything else is sent to the assistant.";

const EXIT_WORDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

impl ReplCommand {
    /// Parse one trimmed, non-empty input line.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if EXIT_WORDS.contains(&line) {
            return Self::Exit;
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word {
            "search" => with_arg(rest, Self::Search, "search <query>"),
            "browse" => with_arg(rest, Self::Browse, "browse <url>"),
            "http" => with_arg(rest, Self::Http, "http <url>"),
            "context" => with_arg(rest, Self::Context, "context <query>"),
            "memory" => Self::parse_memory(rest),
            "clear" if rest.is_empty() => Self::Clear,
            "help" if rest.is_empty() => Self::Help,
            _ => Self::Chat(line.to_string()),
        }
    }

    fn parse_memory(rest: &str) -> Self {
        let (view, arg) = match rest.split_once(char::is_whitespace) {
            Some((view, arg)) => (view, arg.trim()),
            None => (rest, ""),
        };
        let view = match view {
            "" | "stats" => MemoryView::Stats,
            "documents" => MemoryView::Documents,
            "metadata" => MemoryView::Metadata,
            "tools" => MemoryView::Tools,
            "messages" => MemoryView::Messages,
            "search" if !arg.is_empty() => MemoryView::Search(arg.to_string()),
            "search" => return Self::Usage("memory search <query>"),
            _ => return Self::Usage("memory [documents|metadata|tools|messages|search <query>]"),
        };
        Self::Memory(view)
    }
}

fn with_arg(arg: &str, build: fn(String) -> ReplCommand, usage: &'static str) -> ReplCommand {
    if arg.is_empty() {
        ReplCommand::Usage(usage)
    } else {
        build(arg.to_string())
    }
}
