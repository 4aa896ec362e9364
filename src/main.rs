use anyhow::{anyhow, Context};
use clap::Parser;
use live_sync::test_infrastructure::FakeStore;
use live_sync::{
	AuthSession, CollectionWatcher, DocumentRef, DocumentSnapshot, DocumentWatcher, ErrorChannel,
	EventKind, FilterOp, QueryRef, QuerySnapshot, StoreError, StoreErrorCode, SubscriptionId,
	Watcher, WatcherConfig,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "live-sync")]
#[command(
	about = "Replays a scripted store session against live document and collection watchers"
)]
struct Cli {
	/// JSON script to replay (a built-in scenario runs when omitted)
	#[arg(short, long)]
	script: Option<PathBuf>,

	/// Enable verbose logging
	#[arg(short, long)]
	verbose: bool,

	/// Print watcher states and failure events as JSON lines
	#[arg(short, long)]
	json: bool,

	/// Pause between steps in milliseconds
	#[arg(long, default_value_t = 0)]
	step_delay_ms: u64,
}

#[derive(Debug, Deserialize)]
struct Script {
	/// Signed-in user; `user_collection` steps resolve against it
	uid: Option<String>,
	steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Step {
	WatchDocument { watcher: String, path: Option<String> },
	WatchCollection {
		watcher: String,
		collection: String,
		#[serde(default)]
		equals: BTreeMap<String, Value>,
	},
	WatchUserCollection { watcher: String, collection: String },
	EmitDocument { watcher: String, id: String, fields: Map<String, Value> },
	EmitMissing { watcher: String, id: String },
	EmitQuery { watcher: String, docs: Vec<DocumentSnapshot> },
	Fail { watcher: String, code: StoreErrorCode, message: String },
	Resubscribe { watcher: String },
	Clear { watcher: String },
	Drop { watcher: String },
}

enum DemoWatcher {
	Document(DocumentWatcher),
	Collection(CollectionWatcher),
}

impl DemoWatcher {
	fn subscription(&self) -> Option<SubscriptionId> {
		match self {
			DemoWatcher::Document(w) => w.subscription_id(),
			DemoWatcher::Collection(w) => w.subscription_id(),
		}
	}

	fn state_json(&self) -> serde_json::Result<Value> {
		match self {
			DemoWatcher::Document(w) => serde_json::to_value(w.state()),
			DemoWatcher::Collection(w) => serde_json::to_value(w.state()),
		}
	}
}

struct Session {
	store: Arc<FakeStore>,
	channel: ErrorChannel,
	auth: Option<AuthSession>,
	watchers: BTreeMap<String, DemoWatcher>,
	json: bool,
}

impl Session {
	fn config(name: &str) -> WatcherConfig {
		WatcherConfig::with_label(name)
	}

	fn subscription(&self, name: &str) -> anyhow::Result<SubscriptionId> {
		self.watchers
			.get(name)
			.ok_or_else(|| anyhow!("unknown watcher '{name}'"))?
			.subscription()
			.ok_or_else(|| anyhow!("watcher '{name}' holds no subscription"))
	}

	fn run(&mut self, step: Step) -> anyhow::Result<Option<String>> {
		let touched = match step {
			Step::WatchDocument { watcher, path } => {
				let reference = path.as_deref().map(DocumentRef::parse).transpose()?;
				match self.watchers.get(&watcher) {
					Some(DemoWatcher::Document(w)) => w.set_reference(reference),
					Some(DemoWatcher::Collection(_)) => {
						return Err(anyhow!("watcher '{watcher}' watches a collection"));
					}
					None => {
						let w: DocumentWatcher = Watcher::with_config(
							self.store.clone(),
							self.channel.clone(),
							Self::config(&watcher),
							reference,
						)?;
						self.watchers.insert(watcher.clone(), DemoWatcher::Document(w));
					}
				}
				watcher
			}
			Step::WatchCollection { watcher, collection, equals } => {
				let mut query = QueryRef::collection(&collection)?;
				for (field, value) in equals {
					query = query.where_field(&field, FilterOp::Eq, value);
				}
				self.watch_query(&watcher, Some(query))?;
				watcher
			}
			Step::WatchUserCollection { watcher, collection } => {
				let query = self.auth.as_ref().map(|a| a.user_collection(&collection)).transpose()?;
				self.watch_query(&watcher, query)?;
				watcher
			}
			Step::EmitDocument { watcher, id, fields } => {
				let sub = self.subscription(&watcher)?;
				self.store.emit_document(sub, DocumentSnapshot::found(id, fields));
				watcher
			}
			Step::EmitMissing { watcher, id } => {
				let sub = self.subscription(&watcher)?;
				self.store.emit_document(sub, DocumentSnapshot::missing(id));
				watcher
			}
			Step::EmitQuery { watcher, docs } => {
				let sub = self.subscription(&watcher)?;
				self.store.emit_query(sub, QuerySnapshot::new(docs));
				watcher
			}
			Step::Fail { watcher, code, message } => {
				let sub = self.subscription(&watcher)?;
				self.store.emit_error(sub, StoreError::new(code, message));
				watcher
			}
			Step::Resubscribe { watcher } => {
				match self.watchers.get(&watcher) {
					Some(DemoWatcher::Document(w)) => w.resubscribe(),
					Some(DemoWatcher::Collection(w)) => w.resubscribe(),
					None => return Err(anyhow!("unknown watcher '{watcher}'")),
				}
				watcher
			}
			Step::Clear { watcher } => {
				match self.watchers.get(&watcher) {
					Some(DemoWatcher::Document(w)) => w.clear(),
					Some(DemoWatcher::Collection(w)) => w.clear(),
					None => return Err(anyhow!("unknown watcher '{watcher}'")),
				}
				watcher
			}
			Step::Drop { watcher } => {
				self.watchers.remove(&watcher);
				info!("Dropped watcher '{}'", watcher);
				return Ok(None);
			}
		};
		Ok(Some(touched))
	}

	fn watch_query(&mut self, name: &str, query: Option<QueryRef>) -> anyhow::Result<()> {
		match self.watchers.get(name) {
			Some(DemoWatcher::Collection(w)) => w.set_reference(query),
			Some(DemoWatcher::Document(_)) => {
				return Err(anyhow!("watcher '{name}' watches a document"));
			}
			None => {
				let w: CollectionWatcher = Watcher::with_config(
					self.store.clone(),
					self.channel.clone(),
					Self::config(name),
					query,
				)?;
				self.watchers.insert(name.to_string(), DemoWatcher::Collection(w));
			}
		}
		Ok(())
	}

	fn report(&self, name: &str) -> anyhow::Result<()> {
		let Some(watcher) = self.watchers.get(name) else {
			return Ok(());
		};
		let state = watcher.state_json()?;
		if self.json {
			println!("{}", serde_json::json!({ "watcher": name, "state": state }));
		} else {
			info!("{} -> {}", name, state);
		}
		Ok(())
	}
}

fn builtin_script() -> anyhow::Result<Script> {
	let raw = serde_json::json!({
		"uid": "42",
		"steps": [
			{ "op": "watch_document", "watcher": "profile", "path": "users/42" },
			{ "op": "emit_document", "watcher": "profile", "id": "42", "fields": { "name": "Ana" } },
			{ "op": "watch_user_collection", "watcher": "incidents", "collection": "incidents" },
			{ "op": "emit_query", "watcher": "incidents", "docs": [] },
			{ "op": "watch_document", "watcher": "profile", "path": "users/7" },
			{ "op": "fail", "watcher": "profile", "code": "permission-denied",
			  "message": "missing or insufficient permissions" },
			{ "op": "watch_document", "watcher": "profile", "path": null },
			{ "op": "drop", "watcher": "incidents" }
		]
	});
	Ok(serde_json::from_value(raw)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	// Initialize tracing
	let level = if cli.verbose {
		Level::DEBUG
	} else {
		Level::INFO
	};
	tracing_subscriber::fmt().with_max_level(level).init();

	let script = match &cli.script {
		Some(path) => {
			let raw = tokio::fs::read_to_string(path)
				.await
				.with_context(|| format!("reading script {}", path.display()))?;
			serde_json::from_str(&raw).with_context(|| format!("parsing script {}", path.display()))?
		}
		None => builtin_script()?,
	};

	let channel = ErrorChannel::global().clone();
	let json = cli.json;
	let token = channel.subscribe(EventKind::PermissionDenied, move |event| {
		if json {
			println!("{}", serde_json::json!({ "failure": event }));
		} else {
			info!(
				"Failure event: {} denied on {} ({})",
				event.attempted_operation, event.target_description, event.message
			);
		}
	});

	let auth = script.uid.as_deref().map(AuthSession::new).transpose()?;
	let mut session = Session {
		store: FakeStore::new(),
		channel: channel.clone(),
		auth,
		watchers: BTreeMap::new(),
		json,
	};

	info!("Replaying {} step(s)", script.steps.len());

	for step in script.steps {
		if let Some(name) = session.run(step)? {
			session.report(&name)?;
		}
		if cli.step_delay_ms > 0 {
			tokio::time::sleep(Duration::from_millis(cli.step_delay_ms)).await;
		}
	}

	session.watchers.clear();
	channel.unsubscribe(token);

	info!(
		"Done: {} subscription(s) opened, {} released",
		session.store.opened().len(),
		session.store.released().len()
	);

	Ok(())
}
