use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumIter, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug,
    Clone,
    Copy,
    Type,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    TS,
    EnumString,
    EnumIter,
    Display,
    Default,
)]
#[sqlx(type_name = "budget_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BudgetCategory {
    PreProduction,
    #[default]
    Production,
    PostProduction,
    Cast,
    Crew,
    Location,
    Equipment,
    Art,
    Wardrobe,
    Makeup,
    Catering,
    Transport,
    Insurance,
    Marketing,
    Contingency,
    Other,
}

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "budget_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BudgetStatus {
    #[default]
    Estimated,
    Quoted,
    Approved,
    Paid,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct BudgetItem {
    pub id: Uuid,
    pub project_id: Uuid,
    pub item_name: String,
    pub description: Option<String>,
    pub category: BudgetCategory,
    pub subcategory: Option<String>,
    pub quantity: f64,
    pub unit: Option<String>, // "day", "week", "unit"...
    pub unit_price: f64,
    pub total_price: f64, // quantity * unit_price, kept in sync on every write
    pub currency: String,
    pub supplier: Option<String>,
    pub contact: Option<String>,
    pub payment_method: Option<String>,
    pub status: BudgetStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct CreateBudgetItem {
    pub item_name: String,
    pub description: Option<String>,
    pub category: Option<BudgetCategory>,
    pub subcategory: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub unit_price: Option<f64>,
    pub currency: Option<String>,
    pub supplier: Option<String>,
    pub contact: Option<String>,
    pub payment_method: Option<String>,
    pub status: Option<BudgetStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateBudgetItem {
    pub item_name: Option<String>,
    pub description: Option<String>,
    pub category: Option<BudgetCategory>,
    pub subcategory: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub unit_price: Option<f64>,
    pub currency: Option<String>,
    pub supplier: Option<String>,
    pub contact: Option<String>,
    pub payment_method: Option<String>,
    pub status: Option<BudgetStatus>,
    pub notes: Option<String>,
}

impl BudgetItem {
    pub async fn create<'e, E>(
        executor: E,
        project_id: Uuid,
        data: &CreateBudgetItem,
        default_currency: &str,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let quantity = data.quantity.unwrap_or(1.0);
        let unit_price = data.unit_price.unwrap_or(0.0);

        sqlx::query_as::<_, BudgetItem>(
            r#"INSERT INTO budget_items (
                   id, project_id, item_name, description, category, subcategory, quantity,
                   unit, unit_price, total_price, currency, supplier, contact, payment_method,
                   status, notes
               )
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(&data.item_name)
        .bind(&data.description)
        .bind(data.category.unwrap_or_default())
        .bind(&data.subcategory)
        .bind(quantity)
        .bind(&data.unit)
        .bind(unit_price)
        .bind(quantity * unit_price)
        .bind(data.currency.as_deref().unwrap_or(default_currency))
        .bind(&data.supplier)
        .bind(&data.contact)
        .bind(&data.payment_method)
        .bind(data.status.unwrap_or_default())
        .bind(&data.notes)
        .fetch_one(executor)
        .await
    }

    /// Inserts all items or none.
    pub async fn create_many(
        pool: &SqlitePool,
        project_id: Uuid,
        items: &[CreateBudgetItem],
        default_currency: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut created = Vec::with_capacity(items.len());
        for item in items {
            created.push(Self::create(&mut *tx, project_id, item, default_currency).await?);
        }
        tx.commit().await?;
        Ok(created)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, BudgetItem>("SELECT * FROM budget_items WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_project(
        pool: &SqlitePool,
        project_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, BudgetItem>(
            r#"SELECT * FROM budget_items
               WHERE project_id = $1
               ORDER BY category, item_name, rowid"#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateBudgetItem,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, BudgetItem>(
            r#"UPDATE budget_items
               SET item_name = COALESCE($1, item_name),
                   description = COALESCE($2, description),
                   category = COALESCE($3, category),
                   subcategory = COALESCE($4, subcategory),
                   quantity = COALESCE($5, quantity),
                   unit = COALESCE($6, unit),
                   unit_price = COALESCE($7, unit_price),
                   total_price = COALESCE($5, quantity) * COALESCE($7, unit_price),
                   currency = COALESCE($8, currency),
                   supplier = COALESCE($9, supplier),
                   contact = COALESCE($10, contact),
                   payment_method = COALESCE($11, payment_method),
                   status = COALESCE($12, status),
                   notes = COALESCE($13, notes),
                   updated_at = datetime('now', 'subsec')
               WHERE id = $14
               RETURNING *"#,
        )
        .bind(&data.item_name)
        .bind(&data.description)
        .bind(data.category)
        .bind(&data.subcategory)
        .bind(data.quantity)
        .bind(&data.unit)
        .bind(data.unit_price)
        .bind(&data.currency)
        .bind(&data.supplier)
        .bind(&data.contact)
        .bind(&data.payment_method)
        .bind(data.status)
        .bind(&data.notes)
        .bind(id)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM budget_items WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
