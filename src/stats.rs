//! Row counts for the local SQLite database (`proom stats`).

use anyhow::{bail, Result};
use sqlx::Row;

use crate::config::{BackendKind, Config};
use crate::db;
use crate::migrate::TABLES;

pub async fn run_stats(config: &Config) -> Result<()> {
    if config.backend.kind != BackendKind::Sqlite {
        bail!("stats is only available for the sqlite backend");
    }
    let pool = db::connect(config).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("PracticeRoom Database Stats");
    println!("===========================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();

    for table in TABLES {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&pool)
            .await?;
        println!("  {:<12} {}", format!("{}:", table), count);
    }

    let status_rows = sqlx::query(
        "SELECT status, COUNT(*) AS n FROM follows GROUP BY status ORDER BY status",
    )
    .fetch_all(&pool)
    .await?;
    if !status_rows.is_empty() {
        println!();
        println!("  Follow edges by status:");
        for row in &status_rows {
            let status: String = row.get("status");
            let n: i64 = row.get("n");
            println!("    {:<10} {}", status, n);
        }
    }
    println!();

    pool.close().await;
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
