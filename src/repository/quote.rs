use chrono::{Datelike, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::References;
use crate::{
    db::{Database, Table},
    error::{AppError, AppResult},
    models::{clean, CreateQuote, Quote, QuoteFilter, QuoteItem, QuoteItemInput, UpdateQuote},
};

const COLUMNS: &str = "id, site_id, deal_id, customer_id, quote_number, status, valid_until, notes, created_by, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct QuoteRepository {
    db: Database,
}

impl QuoteRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, site_id: i64, filter: &QuoteFilter) -> AppResult<Vec<Quote>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {COLUMNS} FROM quotes WHERE is_deleted = 0 AND site_id = "
        ));
        query.push_bind(site_id);
        if let Some(deal_id) = filter.deal_id {
            query.push(" AND deal_id = ").push_bind(deal_id);
        }
        if let Some(customer_id) = filter.customer_id {
            query.push(" AND customer_id = ").push_bind(customer_id);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        query.push(" ORDER BY created_at DESC, id DESC");

        let headers = query.build_query_as::<Quote>().fetch_all(self.db.pool()).await?;
        let mut quotes = Vec::with_capacity(headers.len());
        for quote in headers {
            let items = self.items(quote.id).await?;
            quotes.push(quote.with_items(items));
        }
        Ok(quotes)
    }

    pub async fn get(&self, site_id: i64, id: i64) -> AppResult<Quote> {
        let quote = sqlx::query_as::<_, Quote>(&format!(
            "SELECT {COLUMNS} FROM quotes WHERE id = ? AND site_id = ? AND is_deleted = 0"
        ))
        .bind(id)
        .bind(site_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| AppError::not_found("Quote"))?;
        let items = self.items(quote.id).await?;
        Ok(quote.with_items(items))
    }

    /// Insert the header and its items in one transaction
    pub async fn create(&self, site_id: i64, user_id: i64, input: &CreateQuote) -> AppResult<Quote> {
        let mut refs = References::new(&self.db, site_id);
        refs.check("dealId", Table::Deals, input.deal_id).await?;
        refs.check("customerId", Table::Customers, input.customer_id).await?;
        refs.finish()?;

        let mut tx = self.db.pool().begin().await?;
        let quote_number = match clean(input.quote_number.as_deref()) {
            Some(number) => number,
            None => next_quote_number(&mut tx, site_id).await?,
        };

        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO quotes (site_id, deal_id, customer_id, quote_number, status, valid_until, notes, created_by, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(site_id)
        .bind(input.deal_id)
        .bind(input.customer_id)
        .bind(&quote_number)
        .bind(input.status.unwrap_or_default())
        .bind(input.valid_until)
        .bind(clean(input.notes.as_deref()))
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(quote_number_conflict)?
        .last_insert_rowid();

        insert_items(&mut tx, id, &input.items).await?;
        tx.commit().await?;

        tracing::info!("🧾 Created quote {} in site {}", quote_number, site_id);
        self.get(site_id, id).await
    }

    pub async fn update(&self, site_id: i64, id: i64, patch: &UpdateQuote) -> AppResult<Quote> {
        let mut quote = self.get(site_id, id).await?;
        quote.apply(patch);

        let mut refs = References::new(&self.db, site_id);
        refs.check("dealId", Table::Deals, patch.deal_id).await?;
        refs.check("customerId", Table::Customers, patch.customer_id).await?;
        refs.finish()?;

        sqlx::query(
            "UPDATE quotes SET deal_id = ?, customer_id = ?, quote_number = ?, status = ?, valid_until = ?, notes = ?, updated_at = ? \
             WHERE id = ? AND site_id = ? AND is_deleted = 0",
        )
        .bind(quote.deal_id)
        .bind(quote.customer_id)
        .bind(&quote.quote_number)
        .bind(quote.status)
        .bind(quote.valid_until)
        .bind(&quote.notes)
        .bind(Utc::now())
        .bind(id)
        .bind(site_id)
        .execute(self.db.pool())
        .await
        .map_err(quote_number_conflict)?;
        self.get(site_id, id).await
    }

    /// Swap the full item list; either every new item lands or none do
    pub async fn replace_items(
        &self,
        site_id: i64,
        id: i64,
        items: &[QuoteItemInput],
    ) -> AppResult<Quote> {
        let mut tx = self.db.pool().begin().await?;
        let touched = sqlx::query(
            "UPDATE quotes SET updated_at = ? WHERE id = ? AND site_id = ? AND is_deleted = 0",
        )
        .bind(Utc::now())
        .bind(id)
        .bind(site_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if touched == 0 {
            return Err(AppError::not_found("Quote"));
        }

        sqlx::query("DELETE FROM quote_items WHERE quote_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_items(&mut tx, id, items).await?;
        tx.commit().await?;

        self.get(site_id, id).await
    }

    pub async fn delete(&self, site_id: i64, id: i64) -> AppResult<()> {
        if super::soft_delete(&self.db, Table::Quotes, site_id, id).await? {
            Ok(())
        } else {
            Err(AppError::not_found("Quote"))
        }
    }

    async fn items(&self, quote_id: i64) -> AppResult<Vec<QuoteItem>> {
        let items = sqlx::query_as::<_, QuoteItem>(
            "SELECT id, quote_id, description, quantity, unit_price, sort_order \
             FROM quote_items WHERE quote_id = ? ORDER BY sort_order, id",
        )
        .bind(quote_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(items)
    }
}

async fn insert_items(
    conn: &mut SqliteConnection,
    quote_id: i64,
    items: &[QuoteItemInput],
) -> Result<(), sqlx::Error> {
    for (position, item) in items.iter().enumerate() {
        sqlx::query(
            "INSERT INTO quote_items (quote_id, description, quantity, unit_price, sort_order) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(quote_id)
        .bind(item.description.trim())
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(position as i64)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// `Q-<year>-<seq>`, one past the highest sequence already used in the site and year
///
/// Manually supplied numbers with the same prefix count too, so they never
/// block the generated sequence.
async fn next_quote_number(conn: &mut SqliteConnection, site_id: i64) -> Result<String, sqlx::Error> {
    let prefix = format!("Q-{}-", Utc::now().year());
    let highest: Option<i64> = sqlx::query_scalar(
        "SELECT MAX(CAST(substr(quote_number, ?) AS INTEGER)) FROM quotes \
         WHERE site_id = ? AND quote_number LIKE ? || '%'",
    )
    .bind(prefix.len() as i64 + 1)
    .bind(site_id)
    .bind(&prefix)
    .fetch_one(&mut *conn)
    .await?;
    Ok(format!("{prefix}{:04}", highest.unwrap_or(0) + 1))
}

fn quote_number_conflict(err: sqlx::Error) -> AppError {
    match AppError::from(err) {
        AppError::Conflict(_) => AppError::Conflict("quote number already exists on this site".into()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::seeded;

    fn item(description: &str, quantity: f64, unit_price: f64) -> QuoteItemInput {
        QuoteItemInput {
            description: description.into(),
            quantity,
            unit_price,
        }
    }

    fn draft(items: Vec<QuoteItemInput>) -> CreateQuote {
        CreateQuote {
            quote_number: None,
            deal_id: None,
            customer_id: None,
            status: None,
            valid_until: None,
            notes: None,
            items,
        }
    }

    #[tokio::test]
    async fn create_generates_number_and_total() {
        let (_, repos) = seeded().await;
        let first = repos
            .quotes
            .create(1, 1, &draft(vec![item("Setup", 1.0, 200.0), item("Hours", 3.0, 50.0)]))
            .await
            .unwrap();
        let second = repos.quotes.create(1, 1, &draft(vec![])).await.unwrap();

        let year = Utc::now().year();
        assert_eq!(first.quote_number, format!("Q-{year}-0001"));
        assert_eq!(second.quote_number, format!("Q-{year}-0002"));
        assert_eq!(first.total, 350.0);
        assert_eq!(first.items[1].description, "Hours");
    }

    #[tokio::test]
    async fn replace_items_swaps_the_whole_list() {
        let (_, repos) = seeded().await;
        let quote = repos
            .quotes
            .create(1, 1, &draft(vec![item("Setup", 1.0, 200.0)]))
            .await
            .unwrap();
        let replaced = repos
            .quotes
            .replace_items(1, quote.id, &[item("Licence", 2.0, 25.0)])
            .await
            .unwrap();
        assert_eq!(replaced.items.len(), 1);
        assert_eq!(replaced.total, 50.0);

        let err = repos
            .quotes
            .replace_items(2, quote.id, &[item("Licence", 2.0, 25.0)])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn generated_numbers_skip_past_manual_ones() {
        let (_, repos) = seeded().await;
        let year = Utc::now().year();
        let mut manual = draft(vec![]);
        manual.quote_number = Some(format!("Q-{year}-0002"));
        repos.quotes.create(1, 1, &manual).await.unwrap();

        let next = repos.quotes.create(1, 1, &draft(vec![])).await.unwrap();
        assert_eq!(next.quote_number, format!("Q-{year}-0003"));
        let after = repos.quotes.create(1, 1, &draft(vec![])).await.unwrap();
        assert_eq!(after.quote_number, format!("Q-{year}-0004"));

        // Deleted quotes keep their numbers reserved.
        repos.quotes.delete(1, after.id).await.unwrap();
        let again = repos.quotes.create(1, 1, &draft(vec![])).await.unwrap();
        assert_eq!(again.quote_number, format!("Q-{year}-0005"));
    }

    #[tokio::test]
    async fn duplicate_number_conflicts() {
        let (_, repos) = seeded().await;
        let mut input = draft(vec![]);
        input.quote_number = Some("Q-CUSTOM".into());
        repos.quotes.create(1, 1, &input).await.unwrap();
        let err = repos.quotes.create(1, 1, &input).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        // Numbers are per site
        repos.quotes.create(2, 2, &input).await.unwrap();
    }
}
