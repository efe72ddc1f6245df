//! Line-oriented terminal front-end.

use crate::core::conversation::{ConversationDeps, ConversationView};
use crate::core::directory::SessionDirectory;
use crate::core::notifications::{Notifier, Toast, ToastLevel};
use crate::core::router::{Screen, SessionRouter};
use crate::core::traits::{AuthProvider, StudyService};
use crate::core::transcript::{Speaker, THINKING_INDICATOR, TranscriptLine};
use crate::infrastructure::identity::IdentityClient;
use crate::media::ClipboardItem;
use di::Ref;
use log::error;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const TRANSCRIPT_WIDTH: usize = 72;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { email: String, password: String },
    Logout,
    List,
    New { name: String, instruction: Option<String> },
    Open(usize),
    Say(String),
    Image(PathBuf),
    Paste(Vec<PathBuf>),
    Record,
    History,
    Back,
    Help,
    Quit,
    Unknown(String),
}

/// Parses one input line for the given screen. Blank lines yield `None`.
pub fn parse_command(screen: Screen, line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Screen::Conversation(_) = screen {
        let Some(rest) = line.strip_prefix('/') else {
            return Some(Command::Say(line.to_owned()));
        };
        let (name, args) = rest.split_once(' ').unwrap_or((rest, ""));
        let paths: Vec<PathBuf> = args.split_whitespace().map(PathBuf::from).collect();

        return Some(match name {
            "image" if paths.len() == 1 => Command::Image(paths[0].clone()),
            "paste" if !paths.is_empty() => Command::Paste(paths),
            "record" => Command::Record,
            "history" => Command::History,
            "back" => Command::Back,
            "help" => Command::Help,
            "quit" => Command::Quit,
            _ => Command::Unknown(line.to_owned()),
        });
    }

    let (name, args) = line.split_once(' ').unwrap_or((line, ""));
    let args = args.trim();
    Some(match (screen, name) {
        (Screen::SignIn, "login") => match args.split_once(' ') {
            Some((email, password)) if !password.trim().is_empty() => Command::Login {
                email: email.to_owned(),
                password: password.trim().to_owned(),
            },
            _ => Command::Unknown(line.to_owned()),
        },
        (Screen::Directory, "list") => Command::List,
        (Screen::Directory, "logout") => Command::Logout,
        (Screen::Directory, "new") => {
            let (name, instruction) = match args.split_once('|') {
                Some((name, instruction)) => (name, Some(instruction.trim().to_owned())),
                None => (args, None),
            };
            Command::New {
                name: name.trim().to_owned(),
                instruction: instruction.filter(|text| !text.is_empty()),
            }
        }
        (Screen::Directory, "open") => match args.parse::<usize>() {
            Ok(number) if number > 0 => Command::Open(number),
            _ => Command::Unknown(line.to_owned()),
        },
        (_, "help") => Command::Help,
        (_, "quit") => Command::Quit,
        _ => Command::Unknown(line.to_owned()),
    })
}

pub fn format_toast(toast: &Toast) -> String {
    let marker = match toast.level {
        ToastLevel::Success => "ok",
        ToastLevel::Error => "!!",
    };
    format!("[{marker}] {}: {}", toast.title, toast.description)
}

pub fn render_directory(directory: &SessionDirectory) -> String {
    if let Some(prompt) = directory.empty_state() {
        return format!("{prompt}\nUse: new <name> [| <instructions>]");
    }

    directory
        .sessions()
        .iter()
        .enumerate()
        .map(|(index, session)| {
            format!(
                "{:>3}. {}  (last active {})",
                index + 1,
                session.name,
                session.updated_at.format("%Y-%m-%d %H:%M")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_transcript_lines(lines: &[TranscriptLine]) -> String {
    let mut out = Vec::new();
    for line in lines {
        match line {
            TranscriptLine::Bubble(bubble) => match bubble.speaker {
                Speaker::Student => {
                    let label = match bubble.badge {
                        Some(badge) => format!("you [{badge}]"),
                        None => "you".to_owned(),
                    };
                    out.push(format!("{label:>width$}", width = TRANSCRIPT_WIDTH));
                    for text in bubble.text.lines() {
                        out.push(format!("{text:>width$}", width = TRANSCRIPT_WIDTH));
                    }
                }
                Speaker::Assistant => {
                    out.push("assistant".to_owned());
                    out.push(bubble.text.clone());
                }
            },
            TranscriptLine::Thinking => out.push(THINKING_INDICATOR.to_owned()),
        }
    }
    out.join("\n")
}

fn help(screen: Screen) -> &'static str {
    match screen {
        Screen::Loading => "",
        Screen::SignIn => "login <email> <password> | quit",
        Screen::Directory => "list | new <name> [| <instructions>] | open <n> | logout | quit",
        Screen::Conversation(_) => {
            "<text> | /image <path> | /paste <path>... | /record | /history | /back | /quit"
        }
    }
}

pub struct Shell {
    identity: Ref<IdentityClient>,
    service: Ref<dyn StudyService>,
    deps: ConversationDeps,
    notifier: Notifier,
}

impl Shell {
    pub fn new(identity: Ref<IdentityClient>, deps: ConversationDeps) -> Self {
        Shell {
            identity,
            service: deps.service.clone(),
            notifier: deps.notifier.clone(),
            deps,
        }
    }

    /// Drives the router until stdin closes or the user quits.
    pub async fn run(self, mut toasts: mpsc::UnboundedReceiver<Toast>) -> anyhow::Result<()> {
        let printer = tokio::spawn(async move {
            while let Some(toast) = toasts.recv().await {
                println!("{}", format_toast(&toast));
            }
        });

        let auth: Arc<dyn AuthProvider> = self.identity.clone();
        let mut router = SessionRouter::mount(auth);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut directory: Option<SessionDirectory> = None;
        let mut conversation: Option<ConversationView> = None;

        loop {
            let screen = router.settle().await;
            match screen {
                Screen::Loading | Screen::SignIn => {
                    directory = None;
                    conversation = None;
                }
                Screen::Directory => {
                    conversation = None;
                    if directory.is_none()
                        && let Some(user) = router.current_user()
                    {
                        let mut fresh = SessionDirectory::new(
                            self.service.clone(),
                            user,
                            self.notifier.clone(),
                            router.on_select(),
                        );
                        fresh.refresh().await;
                        println!("{}", render_directory(&fresh));
                        directory = Some(fresh);
                    }
                }
                Screen::Conversation(session_id) => {
                    directory = None;
                    if conversation.as_ref().map(ConversationView::session_id) != Some(session_id) {
                        let view =
                            ConversationView::open(session_id, self.deps.clone(), router.on_back())
                                .await;
                        println!("== {} ==", view.session_name().await);
                        println!("{}", render_transcript_lines(&view.transcript().await));
                        conversation = Some(view);
                    }
                }
            }

            print!("{}> ", prompt_label(screen));
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let Some(command) = parse_command(screen, &line) else {
                continue;
            };

            match command {
                Command::Quit => break,
                Command::Help => println!("{}", help(screen)),
                Command::Unknown(input) => println!("unknown command {input:?}; {}", help(screen)),
                Command::Login { email, password } => {
                    match self.identity.sign_in_with_password(&email, &password).await {
                        Ok(_) => {
                            router.auth_changed().await;
                        }
                        Err(e) => {
                            error!("sign-in failed: {e}");
                            self.notifier.error("Error", "Sign in failed");
                        }
                    }
                }
                Command::Logout => {
                    if let Err(e) = self.identity.sign_out().await {
                        error!("sign-out failed: {e}");
                    }
                    router.auth_changed().await;
                }
                Command::List => {
                    if let Some(directory) = directory.as_mut() {
                        directory.refresh().await;
                        println!("{}", render_directory(directory));
                    }
                }
                Command::New { name, instruction } => {
                    if let Some(directory) = directory.as_mut() {
                        directory.open_create_dialog();
                        directory.set_name(name);
                        directory.set_instruction(instruction.unwrap_or_default());
                        if directory.create_session().await.is_some() {
                            println!("{}", render_directory(directory));
                        }
                    }
                }
                Command::Open(number) => {
                    if let Some(directory) = directory.as_ref()
                        && !directory.select_at(number - 1)
                    {
                        println!("no session #{number}");
                    }
                }
                Command::Say(text) => {
                    if let Some(view) = conversation.as_ref() {
                        view.set_input(text).await;
                        println!("{THINKING_INDICATOR}");
                        view.submit().await;
                        println!("{}", render_transcript_lines(&view.transcript().await));
                    }
                }
                Command::Image(path) => {
                    if let Some(view) = conversation.as_ref() {
                        match tokio::fs::read(&path).await {
                            Ok(bytes) => {
                                println!("{THINKING_INDICATOR}");
                                view.upload_image(ClipboardItem::from_bytes(bytes)).await;
                                println!("{}", render_transcript_lines(&view.transcript().await));
                            }
                            Err(e) => println!("cannot read {}: {e}", path.display()),
                        }
                    }
                }
                Command::Paste(paths) => {
                    if let Some(view) = conversation.as_ref() {
                        let mut items = Vec::new();
                        for path in paths {
                            match tokio::fs::read(&path).await {
                                Ok(bytes) => items.push(ClipboardItem::from_bytes(bytes)),
                                Err(e) => println!("cannot read {}: {e}", path.display()),
                            }
                        }
                        view.paste(items).await;
                        println!("{}", render_transcript_lines(&view.transcript().await));
                    }
                }
                Command::Record => {
                    if let Some(view) = conversation.as_mut() {
                        let outcome = view.toggle_recording().await;
                        if view.is_recording() {
                            println!("recording... send /record again to stop");
                        } else if outcome.is_some() {
                            println!("{}", render_transcript_lines(&view.transcript().await));
                        }
                    }
                }
                Command::History => {
                    if let Some(view) = conversation.as_ref() {
                        view.load_messages().await;
                        println!("{}", render_transcript_lines(&view.transcript().await));
                    }
                }
                Command::Back => {
                    if let Some(view) = conversation.take() {
                        view.back();
                    }
                }
            }
        }

        router.unmount();
        printer.abort();
        Ok(())
    }
}

fn prompt_label(screen: Screen) -> &'static str {
    match screen {
        Screen::Loading => "...",
        Screen::SignIn => "sign-in",
        Screen::Directory => "sessions",
        Screen::Conversation(_) => "chat",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_conversation_text_is_said() {
        let screen = Screen::Conversation(Uuid::new_v4());

        assert_eq!(
            parse_command(screen, "  What is the derivative of x^2?  "),
            Some(Command::Say("What is the derivative of x^2?".to_owned()))
        );
        assert_eq!(parse_command(screen, "   "), None);
        assert_eq!(parse_command(screen, "/back"), Some(Command::Back));
        assert_eq!(
            parse_command(screen, "/paste a.png b.png"),
            Some(Command::Paste(vec![PathBuf::from("a.png"), PathBuf::from("b.png")]))
        );
        assert!(matches!(
            parse_command(screen, "/image"),
            Some(Command::Unknown(_))
        ));
    }

    #[test]
    fn test_directory_commands() {
        assert_eq!(
            parse_command(Screen::Directory, "new Algebra Review"),
            Some(Command::New {
                name: "Algebra Review".to_owned(),
                instruction: None,
            })
        );
        assert_eq!(
            parse_command(Screen::Directory, "new Algebra Review | Use short answers"),
            Some(Command::New {
                name: "Algebra Review".to_owned(),
                instruction: Some("Use short answers".to_owned()),
            })
        );
        assert_eq!(parse_command(Screen::Directory, "open 2"), Some(Command::Open(2)));
        assert!(matches!(
            parse_command(Screen::Directory, "open 0"),
            Some(Command::Unknown(_))
        ));
    }

    #[test]
    fn test_login_requires_password() {
        assert_eq!(
            parse_command(Screen::SignIn, "login a@b.c secret"),
            Some(Command::Login {
                email: "a@b.c".to_owned(),
                password: "secret".to_owned(),
            })
        );
        assert!(matches!(
            parse_command(Screen::SignIn, "login a@b.c"),
            Some(Command::Unknown(_))
        ));
    }

    #[test]
    fn test_toast_format() {
        let toast = Toast {
            level: ToastLevel::Error,
            title: "Error".to_owned(),
            description: "Failed to send message".to_owned(),
        };
        assert_eq!(format_toast(&toast), "[!!] Error: Failed to send message");
    }
}
