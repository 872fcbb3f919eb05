//! Flavor-text catalog.
//!
//! The core hands the presentation layer a response key plus numeric
//! parameters; the actual wording lives here. Each category ships built-in
//! defaults which a JSON pack under `responses/` can extend or replace.
//! Unknown keys degrade to a visible placeholder instead of failing the
//! command.

use crate::store;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::debug;

pub const CATEGORIES: [&str; 6] = ["work", "crime", "death", "injury", "prison", "rob"];

type Pack = HashMap<String, Vec<String>>;

fn pack(entries: &[(&str, &[&str])]) -> Pack {
    entries
        .iter()
        .map(|(key, lines)| {
            (
                (*key).to_string(),
                lines.iter().map(|line| (*line).to_string()).collect(),
            )
        })
        .collect()
}

fn default_pack(category: &str) -> Pack {
    match category {
        "work" => pack(&[
            ("work", &["You worked hard and earned **{amount}** Medals."]),
            (
                "work_rare_success",
                &["You hit the jackpot and earned **{amount}** Medals instead of your usual **{original}** Medals!"],
            ),
        ]),
        "crime" => pack(&[
            (
                "crime_success",
                &["Your crime was successful! You stole **{amount}** Medals."],
            ),
            (
                "crime_rare_success",
                &["A perfect heist! You earned **{amount}** Medals instead of the expected **{original}** Medals!"],
            ),
        ]),
        "death" => pack(&[("death", &["You died and lost **{amount}** Medals."])]),
        "injury" => pack(&[(
            "injury",
            &["You were injured and lost **{amount}** Medals for medical treatment."],
        )]),
        "prison" => pack(&[
            ("prison", &["You were caught and sent to prison!"]),
            ("escape_success", &["You successfully escaped from prison."]),
            ("escape_failure", &["Your escape attempt failed."]),
        ]),
        "rob" => pack(&[
            (
                "rob_success",
                &["You successfully robbed {target} and got **{amount}** Medals."],
            ),
            (
                "rob_injury",
                &["You failed to rob {target} and were injured, losing **{amount}** Medals."],
            ),
            (
                "rob_death",
                &["You died trying to rob {target} and lost **{amount}** Medals."],
            ),
        ]),
        _ => Pack::new(),
    }
}

/// Which category a response key belongs to: direct category name or a
/// `category_`-prefixed key.
fn category_for_key(key: &str) -> Option<&'static str> {
    CATEGORIES
        .iter()
        .find(|category| key == **category || key.starts_with(&format!("{category}_")))
        .copied()
}

pub struct ResponseCatalog {
    dir: PathBuf,
    cache: RwLock<HashMap<String, Pack>>,
}

impl ResponseCatalog {
    pub fn new(dir: PathBuf) -> Self {
        ResponseCatalog {
            dir,
            cache: RwLock::new(HashMap::new()),
        }
    }

    async fn load_category(&self, category: &str) -> Pack {
        {
            let cache = self.cache.read().await;
            if let Some(loaded) = cache.get(category) {
                return loaded.clone();
            }
        }
        // File entries override the defaults key-by-key.
        let mut merged = default_pack(category);
        let from_file: Pack =
            store::read_json_or_default(&self.dir.join(format!("{category}_responses.json")));
        for (key, lines) in from_file {
            merged.insert(key, lines);
        }
        let mut cache = self.cache.write().await;
        cache.insert(category.to_string(), merged.clone());
        merged
    }

    /// Render a response: pick one template for `key` at random and
    /// substitute `{param}` placeholders.
    pub async fn render(&self, key: &str, params: &[(&str, String)]) -> String {
        let Some(category) = category_for_key(key) else {
            debug!("No category found for response key: {key}");
            return format!("No response found for key: {key}");
        };
        let loaded = self.load_category(category).await;
        let Some(lines) = loaded.get(key).filter(|lines| !lines.is_empty()) else {
            debug!("No responses configured for key: {key}");
            return format!("No responses configured for: {key}");
        };
        let pick = rand::Rng::gen_range(&mut rand::thread_rng(), 0..lines.len());
        let mut rendered = lines[pick].clone();
        for (name, value) in params {
            rendered = rendered.replace(&format!("{{{name}}}"), value);
        }
        rendered
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn default_templates_substitute_parameters() {
        let dir = TempDir::new().unwrap();
        let catalog = ResponseCatalog::new(dir.path().to_path_buf());
        let rendered = catalog
            .render("work", &[("amount", "12".to_string())])
            .await;
        assert_eq!(rendered, "You worked hard and earned **12** Medals.");
    }

    #[tokio::test]
    async fn prefixed_keys_resolve_to_their_category() {
        let dir = TempDir::new().unwrap();
        let catalog = ResponseCatalog::new(dir.path().to_path_buf());
        let rendered = catalog
            .render(
                "rob_death",
                &[
                    ("amount", "30".to_string()),
                    ("target", "<@1>".to_string()),
                ],
            )
            .await;
        assert!(rendered.contains("<@1>"));
        assert!(rendered.contains("**30**"));
    }

    #[tokio::test]
    async fn file_pack_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("work_responses.json"),
            b"{\"work\": [\"Custom line: {amount}\"]}",
        )
        .unwrap();
        let catalog = ResponseCatalog::new(dir.path().to_path_buf());
        let rendered = catalog
            .render("work", &[("amount", "7".to_string())])
            .await;
        assert_eq!(rendered, "Custom line: 7");
    }

    #[tokio::test]
    async fn unknown_keys_degrade_to_placeholders() {
        let dir = TempDir::new().unwrap();
        let catalog = ResponseCatalog::new(dir.path().to_path_buf());
        assert_eq!(
            catalog.render("nonsense", &[]).await,
            "No response found for key: nonsense"
        );
        assert_eq!(
            catalog.render("prison_parade", &[]).await,
            "No responses configured for: prison_parade"
        );
    }
}
