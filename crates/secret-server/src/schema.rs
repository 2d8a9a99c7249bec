//! Database schema of the hosted secret table
//!
//! Apply [`SCHEMA_SQL`] once per project (e.g. `secret-server --print-schema | psql`).
//! Every statement is idempotent.

/// Name of the table holding one encrypted secret per user
pub const SECRETS_TABLE: &str = "user_notion_secrets";

/// Migration creating [`SECRETS_TABLE`] with row-level security
pub const SCHEMA_SQL: &str = include_str!("../migrations/0001_user_notion_secrets.sql");

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized() -> String {
        SCHEMA_SQL.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_one_row_per_user_removed_with_account() {
        let sql = normalized();
        assert!(sql.contains(&format!("CREATE TABLE IF NOT EXISTS public.{}", SECRETS_TABLE)));
        assert!(sql.contains(
            "user_id UUID PRIMARY KEY REFERENCES auth.users (id) ON DELETE CASCADE"
        ));
        assert!(sql.contains("encrypted_notion_secret TEXT NOT NULL"));
    }

    #[test]
    fn test_row_level_security() {
        let sql = normalized();
        assert!(sql.contains(&format!(
            "ALTER TABLE public.{} ENABLE ROW LEVEL SECURITY",
            SECRETS_TABLE
        )));
        for action in ["SELECT", "INSERT", "UPDATE", "DELETE"] {
            assert!(
                sql.contains(&format!("FOR {}", action)),
                "missing {} policy",
                action
            );
        }
        assert_eq!(sql.matches("auth.uid() = user_id").count(), 5);
        assert_eq!(
            sql.matches("CREATE POLICY").count(),
            sql.matches("DROP POLICY IF EXISTS").count()
        );
    }

    #[test]
    fn test_updated_at_trigger() {
        let sql = normalized();
        assert!(sql.contains("NEW.updated_at = timezone('utc', now())"));
        assert!(sql.contains("BEFORE UPDATE ON public.user_notion_secrets FOR EACH ROW"));
        assert!(sql.contains("DROP TRIGGER IF EXISTS user_notion_secrets_updated_at"));
    }
}
