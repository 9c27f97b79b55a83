use serde::{Deserialize, Serialize};
use sqlx::{Executor, Postgres, QueryBuilder};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationParams {
    pub page: i64,
    pub page_size: i64,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PaginationParams {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self { page, page_size }.normalized()
    }

    /// Replaces unset (zero) or negative values with the defaults.
    pub fn normalized(self) -> Self {
        Self {
            page: if self.page < 1 { DEFAULT_PAGE } else { self.page },
            page_size: if self.page_size < 1 {
                DEFAULT_PAGE_SIZE
            } else {
                self.page_size
            },
        }
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationResult {
    pub rows: i64,
    pub pages: i64,
}

impl PaginationResult {
    pub fn compute(rows: i64, page_size: i64) -> Self {
        let page_size = page_size.max(1);
        let rows = rows.max(0);
        Self {
            rows,
            pages: rows / page_size + i64::from(rows % page_size != 0),
        }
    }
}

/// One `AND <column> ILIKE <arg>` term of a filter.
#[derive(Debug, Clone)]
struct Condition {
    column: &'static str,
    arg: String,
}

/// Filter predicate shared by a count query and its data query. Rendering both
/// from the same value keeps the reported totals in line with the fetched rows.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a case-insensitive substring match on `column`. Blank needles are ignored.
    pub fn contains_ci(mut self, column: &'static str, needle: &str) -> Self {
        let needle = needle.trim();
        if !needle.is_empty() {
            self.conditions.push(Condition {
                column,
                arg: format!("%{}%", escape_like(needle)),
            });
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Appends ` WHERE TRUE AND ...` with every argument bound.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");
        for c in &self.conditions {
            qb.push(" AND ");
            qb.push(c.column);
            qb.push(" ILIKE ");
            qb.push_bind(c.arg.clone());
        }
    }
}

/// Escapes `%`, `_` and `\` so user input matches literally inside a LIKE pattern.
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Counts the rows of `table` matching `filter` and derives the page count.
pub async fn paginate<'c, E>(
    executor: E,
    table: &str,
    filter: &Filter,
    params: &PaginationParams,
) -> Result<PaginationResult, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let params = params.normalized();
    let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ");
    qb.push(table);
    filter.push_where(&mut qb);
    let rows: i64 = qb.build_query_scalar().fetch_one(executor).await?;
    Ok(PaginationResult::compute(rows, params.page_size))
}
