use std::sync::Arc;

use futures_util::StreamExt;
use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::FramedRead;

use crate::fetch::image_source::ImageSource;
use crate::render::Renderer;
use crate::server::line_codec::CommandLines;
use crate::storage::collection_storage::{CollectionKey, CollectionStore, ImageReference};

const HELP: &str = "OK commands: NEXT, ADD <key>, SHOW <key>, LIST, DELETE <key>, DELETEALL, HELP, QUIT\n";

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Next,
    Add(&'a str),
    Show(&'a str),
    List,
    Delete(&'a str),
    DeleteAll,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command<'_>, &'static str> {
    let (verb, arg) = match line.split_once(char::is_whitespace) {
        Some((verb, arg)) => (verb, arg.trim()),
        None => (line, ""),
    };
    let with_arg = |command| {
        if arg.is_empty() {
            Err("missing-argument")
        } else {
            Ok(command)
        }
    };

    match verb.to_uppercase().as_str() {
        "NEXT" => Ok(Command::Next),
        "ADD" => with_arg(Command::Add(arg)),
        "SHOW" => with_arg(Command::Show(arg)),
        "LIST" => Ok(Command::List),
        "DELETE" => with_arg(Command::Delete(arg)),
        "DELETEALL" => Ok(Command::DeleteAll),
        "HELP" => Ok(Command::Help),
        "QUIT" => Ok(Command::Quit),
        _ => Err("unknown-command"),
    }
}

enum Flow {
    Continue(String),
    Quit(String),
}

fn error_line(code: &str) -> String {
    format!("ERR {}\n", code)
}

/// One client's view: its own store, the image currently on display and the
/// collection picked for display. Everything is dropped when the session ends.
pub struct Session {
    store: CollectionStore,
    current_image: Option<ImageReference>,
    selected: Option<CollectionKey>,
    source: Arc<dyn ImageSource>,
    renderer: Arc<dyn Renderer>,
}

impl Session {
    pub fn new(source: Arc<dyn ImageSource>, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            store: CollectionStore::new(),
            current_image: None,
            selected: None,
            source,
            renderer,
        }
    }

    pub fn store(&self) -> &CollectionStore {
        &self.store
    }

    pub fn current_image(&self) -> Option<&ImageReference> {
        self.current_image.as_ref()
    }

    pub async fn run<R, W>(mut self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        writer.write_all(b"OK imgcollect ready\n").await?;
        let first = self.next_image().await;
        writer.write_all(first.as_bytes()).await?;
        writer.flush().await?;

        let mut lines = FramedRead::new(reader, CommandLines::new());
        while let Some(line) = lines.next().await {
            let line = match line? {
                Ok(line) => line,
                Err(e) => {
                    debug!("rejected input line: {:?}", e);
                    writer.write_all(error_line(e.code()).as_bytes()).await?;
                    writer.flush().await?;
                    continue;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match self.execute(line).await {
                Flow::Continue(reply) => writer.write_all(reply.as_bytes()).await?,
                Flow::Quit(reply) => {
                    writer.write_all(reply.as_bytes()).await?;
                    writer.flush().await?;
                    return Ok(());
                }
            }
            writer.flush().await?;
        }
        Ok(())
    }

    async fn execute(&mut self, line: &str) -> Flow {
        debug!("command: {}", line);
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(code) => return Flow::Continue(error_line(code)),
        };

        let reply = match command {
            Command::Next => self.next_image().await,
            Command::Add(key) => self.add(key),
            Command::Show(key) => self.show(key),
            Command::List => self.render(),
            Command::Delete(key) => self.delete(key),
            Command::DeleteAll => {
                self.store.remove_all();
                self.selected = None;
                format!("OK deleted all\n{}", self.render())
            }
            Command::Help => HELP.to_string(),
            Command::Quit => return Flow::Quit("OK bye\n".to_string()),
        };
        Flow::Continue(reply)
    }

    async fn next_image(&mut self) -> String {
        match self.source.fetch().await {
            Ok(image) => {
                let reply = format!("OK {}\n", image);
                self.current_image = Some(image);
                reply
            }
            Err(e) => {
                warn!("image fetch failed: {}", e);
                error_line(e.code())
            }
        }
    }

    fn add(&mut self, key: &str) -> String {
        let key = match CollectionKey::parse(key) {
            Ok(key) => key,
            Err(e) => return error_line(e.code()),
        };
        let Some(image) = &self.current_image else {
            return error_line("no-image");
        };

        match self.store.add(key.as_str(), image.as_str()) {
            Ok(()) => {
                self.selected = Some(key);
                format!("OK added\n{}", self.render())
            }
            Err(e) => error_line(e.code()),
        }
    }

    fn show(&mut self, key: &str) -> String {
        let key = match CollectionKey::parse(key) {
            Ok(key) if self.store.contains(key.as_str()) => key,
            _ => return error_line("not-found"),
        };
        self.selected = Some(key);
        self.render()
    }

    fn delete(&mut self, key: &str) -> String {
        if let Err(e) = self.store.remove(key) {
            return error_line(e.code());
        }
        if self
            .selected
            .as_ref()
            .is_some_and(|selected| !self.store.contains(selected.as_str()))
        {
            self.selected = None;
        }
        format!("OK deleted\n{}", self.render())
    }

    fn render(&self) -> String {
        let keys: Vec<&CollectionKey> = self.store.list().collect();
        let images = self
            .selected
            .as_ref()
            .map(|key| self.store.get(key.as_str()))
            .unwrap_or_default();
        self.renderer.render(&keys, self.selected.as_ref(), &images)
    }
}
