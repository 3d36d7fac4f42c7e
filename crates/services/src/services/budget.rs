//! Budget generation and per-category totals.

use std::{collections::BTreeMap, str::FromStr, time::Instant};

use db::models::{
    budget_item::{BudgetCategory, BudgetItem, BudgetStatus, CreateBudgetItem},
    scene::Scene,
    script::Script,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use super::{
    content_generator::{
        BudgetBrief, ContentGenerator, GenerationError, GenerationKind, LogScope, SceneBrief,
        log_generation, parse_json_any,
    },
    lenient, prompts,
};

#[derive(Debug, Error)]
pub enum BudgetError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Maps a model-written category onto [`BudgetCategory`].
///
/// Accepts the snake_case names and their Portuguese equivalents; blank is
/// `production`, anything unrecognised is `other`.
pub fn parse_category(raw: Option<&str>) -> BudgetCategory {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return BudgetCategory::Production;
    };
    let key: String = raw
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' => 'o',
            'ú' => 'u',
            'ç' => 'c',
            ' ' | '-' => '_',
            other => other,
        })
        .collect();

    if let Ok(category) = BudgetCategory::from_str(&key) {
        return category;
    }
    match key.as_str() {
        "pre_producao" | "preproduction" => BudgetCategory::PreProduction,
        "producao" => BudgetCategory::Production,
        "pos_producao" | "postproduction" => BudgetCategory::PostProduction,
        "elenco" => BudgetCategory::Cast,
        "equipe" => BudgetCategory::Crew,
        "locacao" | "locations" => BudgetCategory::Location,
        "equipamento" | "equipamentos" => BudgetCategory::Equipment,
        "arte" => BudgetCategory::Art,
        "figurino" => BudgetCategory::Wardrobe,
        "maquiagem" => BudgetCategory::Makeup,
        "alimentacao" => BudgetCategory::Catering,
        "transporte" => BudgetCategory::Transport,
        "seguro" => BudgetCategory::Insurance,
        "contingencia" => BudgetCategory::Contingency,
        _ => BudgetCategory::Other,
    }
}

#[derive(Debug, Deserialize)]
struct GeneratedItem {
    #[serde(default, alias = "name", deserialize_with = "lenient::opt_text")]
    item_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    category: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    subcategory: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_decimal")]
    quantity: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    unit: Option<String>,
    #[serde(default, alias = "unitPrice", deserialize_with = "lenient::opt_decimal")]
    unit_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    supplier: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    notes: Option<String>,
}

/// Budget items from `{"items": [...]}` or a bare array. Nameless items are skipped.
pub fn parse_generated_items(text: &str) -> Result<Vec<CreateBudgetItem>, GenerationError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Answer {
        Wrapped { items: Vec<GeneratedItem> },
        List(Vec<GeneratedItem>),
    }

    let items = match parse_json_any::<Answer>(text)? {
        Answer::Wrapped { items } | Answer::List(items) => items,
    };

    Ok(items
        .into_iter()
        .filter_map(|item| {
            let item_name = item.item_name?;
            Some(CreateBudgetItem {
                item_name,
                description: item.description,
                category: Some(parse_category(item.category.as_deref())),
                subcategory: item.subcategory,
                quantity: Some(item.quantity.unwrap_or(1.0)),
                unit: Some(item.unit.unwrap_or_else(|| "unit".to_string())),
                unit_price: Some(item.unit_price.unwrap_or(0.0)),
                currency: None,
                supplier: item.supplier,
                contact: None,
                payment_method: None,
                status: Some(BudgetStatus::Estimated),
                notes: item.notes,
            })
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
pub struct CategoryTotal {
    pub category: BudgetCategory,
    pub item_count: usize,
    pub subtotal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
pub struct BudgetSummary {
    pub currency: String,
    pub total: f64,
    pub categories: Vec<CategoryTotal>,
}

/// Totals per category, in category order.
pub fn summarize(items: &[BudgetItem], currency: &str) -> BudgetSummary {
    let mut by_category: BTreeMap<BudgetCategory, (usize, f64)> = BTreeMap::new();
    for item in items {
        let entry = by_category.entry(item.category).or_default();
        entry.0 += 1;
        entry.1 += item.total_price;
    }

    BudgetSummary {
        currency: items
            .first()
            .map(|item| item.currency.clone())
            .unwrap_or_else(|| currency.to_string()),
        total: items.iter().map(|item| item.total_price).sum(),
        categories: by_category
            .into_iter()
            .map(|(category, (item_count, subtotal))| CategoryTotal {
                category,
                item_count,
                subtotal,
            })
            .collect(),
    }
}

pub struct BudgetService {
    pool: SqlitePool,
    generator: ContentGenerator,
}

impl BudgetService {
    pub fn new(pool: SqlitePool, generator: ContentGenerator) -> Self {
        Self { pool, generator }
    }

    /// Asks for a full budget from the project's scenes and script and stores it.
    pub async fn generate_for_project(
        &self,
        project_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<Vec<BudgetItem>, BudgetError> {
        let scenes = Scene::find_by_project(&self.pool, project_id).await?;
        let has_script = Script::latest_for_project(&self.pool, project_id)
            .await?
            .is_some();
        let brief = BudgetBrief {
            scenes_count: (!scenes.is_empty()).then_some(scenes.len() as i64),
            has_script,
            scenes: scenes
                .iter()
                .take(5)
                .filter_map(|scene| serde_json::to_value(SceneBrief::from(scene)).ok())
                .collect(),
            currency: self.generator.currency().to_string(),
        };
        let prompt = prompts::budget(&brief);
        let model = self
            .generator
            .model_for(GenerationKind::Budget, false)
            .to_string();

        let started = Instant::now();
        let result = self.generator.ask(&prompt, &model).await;
        let scope = LogScope {
            project_id: Some(project_id),
            user_id,
        };
        log_generation(&self.pool, scope, "budget", &model, started, result.as_ref()).await;
        let items = parse_generated_items(&result?.content)?;
        if items.is_empty() {
            return Err(GenerationError::Unparsable("no budget items in answer".to_string()).into());
        }

        let created =
            BudgetItem::create_many(&self.pool, project_id, &items, self.generator.currency())
                .await?;
        info!(
            project_id = %project_id,
            item_count = created.len(),
            scene_count = scenes.len(),
            "Generated budget"
        );
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use db::DBService;

    use super::*;
    use crate::services::{
        config::ModelSet,
        test_support::{self, ScriptedProvider},
    };

    #[test]
    fn categories_map_from_english_and_portuguese() {
        assert_eq!(parse_category(Some("crew")), BudgetCategory::Crew);
        assert_eq!(parse_category(Some("Equipe")), BudgetCategory::Crew);
        assert_eq!(parse_category(Some("pós-produção")), BudgetCategory::PostProduction);
        assert_eq!(parse_category(Some("pre production")), BudgetCategory::PreProduction);
        assert_eq!(parse_category(Some("fireworks")), BudgetCategory::Other);
        assert_eq!(parse_category(None), BudgetCategory::Production);
        assert_eq!(parse_category(Some("  ")), BudgetCategory::Production);
    }

    #[test]
    fn items_parse_from_wrapped_or_bare_answers() {
        let wrapped = parse_generated_items(
            r#"```json
{"items": [
  {"item_name": "Camera package", "category": "equipamento", "quantity": 4, "unit": "day", "unit_price": 900},
  {"name": "Catering", "unitPrice": "35.5", "category": "alimentacao"},
  {"description": "no name"}
]}
```"#,
        )
        .unwrap();
        assert_eq!(wrapped.len(), 2);
        assert_eq!(wrapped[0].category, Some(BudgetCategory::Equipment));
        assert_eq!(wrapped[1].item_name, "Catering");
        assert_eq!(wrapped[1].quantity, Some(1.0));
        assert_eq!(wrapped[1].unit.as_deref(), Some("unit"));
        assert_eq!(wrapped[1].unit_price, Some(35.5));

        let bare = parse_generated_items(r#"[{"item_name": "Insurance", "category": "seguro"}]"#).unwrap();
        assert_eq!(bare[0].category, Some(BudgetCategory::Insurance));
        assert_eq!(bare[0].unit_price, Some(0.0));
    }

    #[test]
    fn bare_array_after_prose_is_accepted() {
        let items = parse_generated_items(
            "Here is the budget:\n[{\"item_name\": \"Camera\", \"category\": \"equipment\", \"unit_price\": 900}, \
             {\"item_name\": \"Van\", \"category\": \"transporte\", \"quantity\": 2}]",
        )
        .unwrap();
        assert_eq!(
            items.iter().map(|i| i.item_name.as_str()).collect::<Vec<_>>(),
            vec!["Camera", "Van"]
        );
        assert_eq!(items[1].category, Some(BudgetCategory::Transport));

        let wrapped = parse_generated_items("Sure! {\"items\": [{\"item_name\": \"Gaffer\"}]}").unwrap();
        assert_eq!(wrapped[0].item_name, "Gaffer");
    }

    #[tokio::test]
    async fn generated_budget_is_stored_and_summarized() {
        let db = DBService::new_in_memory().await.unwrap();
        let project = test_support::project(&db).await;
        test_support::scene(&db, project.id, 1, "Ana waits.").await;
        let provider = Arc::new(ScriptedProvider::new([r#"{"items": [
            {"item_name": "Director of Photography", "category": "crew", "quantity": 5, "unit_price": 1500},
            {"item_name": "Gaffer", "category": "crew", "quantity": 5, "unit_price": 800},
            {"item_name": "Van", "category": "transport", "quantity": 2, "unit_price": 400}
        ]}"#]));
        let service = BudgetService::new(
            db.pool.clone(),
            ContentGenerator::new(provider.clone(), ModelSet::default(), "BRL".to_string()),
        );

        let items = service.generate_for_project(project.id, None).await.unwrap();
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| i.status == BudgetStatus::Estimated && i.currency == "BRL"));
        assert!(provider.user_prompt(0).contains("Number of scenes: 1"));
        assert!(provider.user_prompt(0).contains("Screenplay: Not available"));

        let stored = BudgetItem::find_by_project(&db.pool, project.id).await.unwrap();
        let summary = summarize(&stored, "BRL");
        assert_eq!(summary.total, 12300.0);
        assert_eq!(
            summary.categories,
            vec![
                CategoryTotal {
                    category: BudgetCategory::Crew,
                    item_count: 2,
                    subtotal: 11500.0
                },
                CategoryTotal {
                    category: BudgetCategory::Transport,
                    item_count: 1,
                    subtotal: 800.0
                },
            ]
        );
    }
}
