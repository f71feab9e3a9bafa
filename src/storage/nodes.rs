use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{DatabaseError, NodeDbRow};
use crate::content::{Node, Whitelist};

const NODE_COLUMNS: &str = "id, category, title, alias, link, changed";

impl Database {
    // ========================================================================
    // Node Operations
    // ========================================================================

    /// Insert a node or replace the stored snapshot with the same id.
    pub async fn upsert_node(&self, node: &Node) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO nodes (id, category, title, alias, link, changed)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                category = excluded.category,
                title = excluded.title,
                alias = excluded.alias,
                link = excluded.link,
                changed = excluded.changed
        "#,
        )
        .bind(node.id)
        .bind(&node.category)
        .bind(&node.title)
        .bind(&node.alias)
        .bind(&node.link)
        .bind(node.changed.timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Upsert many nodes in a single transaction.
    pub async fn upsert_nodes(&self, nodes: &[Node]) -> Result<usize, DatabaseError> {
        if nodes.is_empty() {
            return Ok(0);
        }

        const BATCH_SIZE: usize = 100;
        let mut tx = self.pool.begin().await?;

        for chunk in nodes.chunks(BATCH_SIZE) {
            let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
                "INSERT INTO nodes (id, category, title, alias, link, changed) ",
            );

            builder.push_values(chunk, |mut b, node| {
                b.push_bind(node.id)
                    .push_bind(&node.category)
                    .push_bind(&node.title)
                    .push_bind(&node.alias)
                    .push_bind(&node.link)
                    .push_bind(node.changed.timestamp());
            });

            builder.push(
                " ON CONFLICT(id) DO UPDATE SET category = excluded.category, \
                 title = excluded.title, alias = excluded.alias, \
                 link = excluded.link, changed = excluded.changed",
            );

            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(nodes.len())
    }

    pub async fn get_node(&self, id: i64) -> Result<Option<Node>, DatabaseError> {
        let row: Option<NodeDbRow> =
            sqlx::query_as(&format!("SELECT {} FROM nodes WHERE id = ?", NODE_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(NodeDbRow::into_node).transpose()
    }

    /// Remove a node. Returns whether a row was deleted.
    pub async fn delete_node(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM nodes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All nodes whose category is whitelisted, ordered by id.
    pub async fn eligible_nodes(&self, whitelist: &Whitelist) -> Result<Vec<Node>, DatabaseError> {
        if whitelist.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM nodes WHERE category IN (",
            NODE_COLUMNS
        ));
        let mut categories = builder.separated(", ");
        for category in whitelist.iter() {
            categories.push_bind(category);
        }
        categories.push_unseparated(") ORDER BY id");

        let rows: Vec<NodeDbRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(NodeDbRow::into_node).collect()
    }

    pub async fn count_nodes(&self) -> Result<i64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM nodes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
