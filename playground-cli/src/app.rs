//! Subcommand implementations.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use playground_api::{Bundle, ConsoleEvent, LegacyBundle};
use playground_client::{BundleStore, ClientConfig, RunUpdate, StreamingRunClient};
use tokio::sync::broadcast::error::RecvError;

use crate::render::format_event;

/// Bundle shipped with the binary, used when no file or id is given.
const DEFAULT_BUNDLE: &str = include_str!("../bundles/default.json");

/// Where the bundle to run comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleSource {
    File(PathBuf),
    Stored(String),
    Default,
}

impl BundleSource {
    pub fn from_args(file: Option<PathBuf>, id: Option<String>) -> Self {
        match (file, id) {
            (Some(path), _) => BundleSource::File(path),
            (None, Some(id)) => BundleSource::Stored(id),
            (None, None) => BundleSource::Default,
        }
    }

    async fn resolve(&self, config: &ClientConfig) -> Result<Bundle> {
        match self {
            BundleSource::File(path) => read_bundle(path),
            BundleSource::Stored(id) => {
                let store = BundleStore::new(config.clone())?;
                let stored = store.load(id).await.with_context(|| format!("load {id}"))?;
                Ok(stored.bundle)
            }
            BundleSource::Default => {
                parse_bundle(DEFAULT_BUNDLE).context("built-in bundle is invalid")
            }
        }
    }
}

/// Run a bundle, printing console events until the run ends or Ctrl-C.
pub async fn run(config: ClientConfig, source: BundleSource, timestamps: bool) -> Result<()> {
    let bundle = source.resolve(&config).await?;
    if bundle.files.is_empty() {
        bail!("bundle has no files");
    }

    let client = StreamingRunClient::new(config)?;
    let mut updates = client.subscribe();
    client.run(&bundle).context("a run is already active")?;

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    let mut console = ConsoleCursor::default();
    let mut failed = false;
    let mut print_new = |client: &StreamingRunClient| {
        let events = client.events();
        for event in console.advance(&events) {
            failed |= event.is_syserr();
            println!("{}", format_event(event, timestamps));
        }
    };
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(RunUpdate::Appended { .. }) => print_new(&client),
                Ok(RunUpdate::Finished { .. }) | Err(RecvError::Closed) => {
                    print_new(&client);
                    break;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "console updates lagged, resyncing");
                    print_new(&client);
                }
            },
            _ = &mut interrupt => {
                tracing::info!("interrupted");
                client.stop();
                eprintln!("Stopped.");
                break;
            }
        }
    }

    if failed {
        bail!("run ended with errors");
    }
    Ok(())
}

/// Tracks how much of the run console has been printed.
///
/// Updates only signal that the console grew; the events themselves are read
/// from the client so a lagging receiver never loses lines.
#[derive(Debug, Default)]
struct ConsoleCursor {
    printed: usize,
}

impl ConsoleCursor {
    /// Events not printed yet, marking them as printed.
    fn advance<'a>(&mut self, events: &'a [ConsoleEvent]) -> &'a [ConsoleEvent] {
        let start = self.printed.min(events.len());
        self.printed = events.len();
        &events[start..]
    }
}

/// Print the stored bundle as JSON.
pub async fn load(config: ClientConfig, id: &str) -> Result<()> {
    let store = BundleStore::new(config)?;
    let stored = store.load(id).await.with_context(|| format!("load {id}"))?;
    eprintln!("Loaded {}", stored.id);
    println!("{}", serde_json::to_string_pretty(&stored.bundle)?);
    Ok(())
}

/// Store a bundle file and print its id.
pub async fn save(config: ClientConfig, path: &Path) -> Result<()> {
    let bundle = read_bundle(path)?;
    let store = BundleStore::new(config)?;
    let stored = store.save(&bundle).await.context("save")?;
    println!("{}", stored.id);
    Ok(())
}

fn read_bundle(path: &Path) -> Result<Bundle> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_bundle(&json).with_context(|| format!("failed to parse {}", path.display()))
}

/// Accept both the bundler's `{files}` shape and the legacy `{slug, data}` one.
fn parse_bundle(json: &str) -> Result<Bundle> {
    match Bundle::from_json(json) {
        Ok(bundle) => Ok(bundle),
        Err(err) => match serde_json::from_str::<LegacyBundle>(json) {
            Ok(legacy) => Ok(legacy.normalize()?.bundle),
            Err(_) => Err(err.into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playground_api::Stream;

    #[test]
    fn test_default_bundle_parses() {
        let bundle = parse_bundle(DEFAULT_BUNDLE).unwrap();
        let names: Vec<_> = bundle.files.iter().map(|f| f.basename()).collect();
        assert_eq!(names, ["server.go", "client.go"]);
    }

    #[test]
    fn test_parse_legacy_bundle() {
        let bundle = parse_bundle(
            r#"{"link":"_abc","data":"{\"files\":[{\"name\":\"a.go\",\"body\":\"x\"}]}"}"#,
        )
        .unwrap();
        assert_eq!(bundle.files[0].name, "a.go");
    }

    #[test]
    fn test_parse_garbage_reports_bundle_error() {
        let err = parse_bundle("[1, 2]").unwrap_err();
        assert!(err.to_string().contains("invalid type"));
    }

    #[test]
    fn test_console_cursor_catches_up_after_lag() {
        let mut console = ConsoleCursor::default();
        let mut events = vec![ConsoleEvent::output(Stream::System, "Running...")];
        assert_eq!(console.advance(&events).len(), 1);
        assert!(console.advance(&events).is_empty());

        // Several batches arrive while no update is read
        events.push(ConsoleEvent::output(Stream::Stdout, "a"));
        events.push(ConsoleEvent::syserr("Error parsing server response."));
        let missed = console.advance(&events);
        assert_eq!(missed, &events[1..]);
        assert!(missed.iter().any(ConsoleEvent::is_syserr));
        assert!(console.advance(&events).is_empty());
    }

    #[test]
    fn test_bundle_source_from_args() {
        assert_eq!(
            BundleSource::from_args(Some("b.json".into()), None),
            BundleSource::File("b.json".into())
        );
        assert_eq!(
            BundleSource::from_args(None, Some("_x".into())),
            BundleSource::Stored("_x".into())
        );
        assert_eq!(BundleSource::from_args(None, None), BundleSource::Default);
    }

    #[test]
    fn test_read_bundle_missing_file() {
        let err = read_bundle(Path::new("/nonexistent/bundle.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
