//! Keyed services with Miftah.

use std::sync::Arc;

use miftah::prelude::*;

// === Define your traits and types ===

trait Storage: Send + Sync {
    fn put(&self, name: &str) -> String;
}

struct Disk {
    root: String,
}

impl Storage for Disk {
    fn put(&self, name: &str) -> String {
        format!("{}/{name}", self.root)
    }
}

struct Bucket;

impl Storage for Bucket {
    fn put(&self, name: &str) -> String {
        format!("s3://uploads/{name}")
    }
}

impl Provides<Arc<dyn Storage>> for Bucket {
    fn provide(_: &dyn Resolver) -> Result<Arc<dyn Storage>> {
        Ok(Arc::new(Bucket))
    }
}

trait Notifier: Send + Sync {
    fn notify(&self, msg: &str) -> String;
}

struct Email;
struct Sms;

impl Notifier for Email {
    fn notify(&self, msg: &str) -> String {
        format!("email: {msg}")
    }
}

impl Notifier for Sms {
    fn notify(&self, msg: &str) -> String {
        format!("sms: {msg}")
    }
}

impl Provides<Arc<dyn Notifier>> for Email {
    fn provide(_: &dyn Resolver) -> Result<Arc<dyn Notifier>> {
        Ok(Arc::new(Email))
    }
}

impl Provides<Arc<dyn Notifier>> for Sms {
    fn provide(_: &dyn Resolver) -> Result<Arc<dyn Notifier>> {
        Ok(Arc::new(Sms))
    }
}

// === Keys ===

enum Local {}
enum Remote {}
enum Alerts {}

/// Depends on one specific storage, by key.
struct Uploader {
    storage: Keyed<Remote, Arc<dyn Storage>>,
}

fn services() -> ServiceCollection {
    let mut services = ServiceCollection::new();
    services
        .add_singleton_value(String::from("/var/data"))
        .add_keyed_singleton_with::<Local, Arc<dyn Storage>>(|r| {
            let root: String = r.resolve()?;
            Ok(Arc::new(Disk { root }))
        })
        .add_keyed_singleton::<Remote, Arc<dyn Storage>, Bucket>()
        .add_keyed_to_collection::<Alerts, Arc<dyn Notifier>, Email>(Scope::Transient)
        .add_keyed_to_collection::<Alerts, Arc<dyn Notifier>, Sms>(Scope::Transient)
        .add_transient_with::<Arc<Uploader>>(|r| {
            let storage: Keyed<Remote, Arc<dyn Storage>> = r.resolve()?;
            Ok(Arc::new(Uploader { storage }))
        });
    services
}

fn main() -> Result<()> {
    // Initialize tracing (logging)
    tracing_subscriber::fmt()
        .with_env_filter("miftah_container=debug")
        .init();

    // === Reference container: composite identities stored as-is ===
    let container = Container::builder().add_collection(services()).build()?;
    println!("✅ {container:?}");

    let local = container.resolve_keyed::<Local, Arc<dyn Storage>>()?;
    println!("💾 {}", local.put("report.csv"));

    let uploader: Arc<Uploader> = container.resolve()?;
    println!("☁️  {}", uploader.storage.value()?.put("report.csv"));

    for notifier in container.resolve_all_keyed::<Alerts, Arc<dyn Notifier>>()? {
        println!("🔔 {}", notifier.notify("upload finished"));
    }

    // === Named registry: keyed registrations extracted and walked ===
    let registry = NamedRegistry::from_collection(services())?;
    println!("\n✅ {registry:?}");

    let remote = registry.resolve_keyed::<Remote, Arc<dyn Storage>>()?;
    println!("☁️  {}", remote.put("archive.tar"));

    if let Err(err) = registry.resolve_keyed::<Local, Arc<dyn Notifier>>() {
        println!("❌ {err}");
    }

    println!("\n🎉 Everything works!");
    Ok(())
}
