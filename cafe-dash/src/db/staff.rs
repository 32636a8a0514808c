//! Staff roster
//!
//! New members default to `Camarero`; an update without a role keeps the
//! stored one.

use cafe_common::db::{StaffMember, StaffRole};
use cafe_common::{Error, Result};
use serde::Deserialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

use super::{parse_id, required_text};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaffInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: Option<StaffRole>,
}

fn member_from_row(row: &SqliteRow) -> Result<StaffMember> {
    let id: String = row.try_get("id")?;
    let role: String = row.try_get("role")?;
    Ok(StaffMember {
        id: parse_id(&id)?,
        name: row.try_get("name")?,
        role: role.parse()?,
    })
}

pub async fn list_staff(pool: &SqlitePool) -> Result<Vec<StaffMember>> {
    let rows = sqlx::query("SELECT id, name, role FROM staff ORDER BY name")
        .fetch_all(pool)
        .await?;
    rows.iter().map(member_from_row).collect()
}

pub async fn create_staff(pool: &SqlitePool, input: &StaffInput) -> Result<StaffMember> {
    let member = StaffMember {
        id: Uuid::new_v4(),
        name: required_text(&input.name, "El nombre es obligatorio")?,
        role: input.role.unwrap_or_default(),
    };

    sqlx::query("INSERT INTO staff (id, name, role) VALUES (?, ?, ?)")
        .bind(member.id.to_string())
        .bind(&member.name)
        .bind(member.role.as_str())
        .execute(pool)
        .await?;

    info!("Added staff member {} ({}) as {}", member.name, member.id, member.role.as_str());
    Ok(member)
}

pub async fn update_staff(pool: &SqlitePool, id: Uuid, input: &StaffInput) -> Result<StaffMember> {
    let name = required_text(&input.name, "El nombre es obligatorio")?;

    let result = sqlx::query("UPDATE staff SET name = ?, role = COALESCE(?, role) WHERE id = ?")
        .bind(&name)
        .bind(input.role.map(|r| r.as_str()))
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Staff member {}", id)));
    }

    let row = sqlx::query("SELECT id, name, role FROM staff WHERE id = ?")
        .bind(id.to_string())
        .fetch_one(pool)
        .await?;
    let member = member_from_row(&row)?;

    info!("Updated staff member {} ({}) as {}", member.name, id, member.role.as_str());
    Ok(member)
}

pub async fn delete_staff(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM staff WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Staff member {}", id)));
    }

    info!("Removed staff member {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::fresh_pool;

    #[tokio::test]
    async fn test_role_defaults_to_camarero() {
        let (_dir, pool) = fresh_pool().await;
        let input = StaffInput {
            name: "Lucía".to_string(),
            role: None,
        };
        let member = create_staff(&pool, &input).await.unwrap();
        assert_eq!(member.role, StaffRole::Camarero);
    }

    #[tokio::test]
    async fn test_update_and_list() {
        let (_dir, pool) = fresh_pool().await;
        let bruno = create_staff(
            &pool,
            &StaffInput {
                name: "Bruno".to_string(),
                role: Some(StaffRole::Barista),
            },
        )
        .await
        .unwrap();
        create_staff(
            &pool,
            &StaffInput {
                name: "Ana".to_string(),
                role: Some(StaffRole::Cajero),
            },
        )
        .await
        .unwrap();

        update_staff(
            &pool,
            bruno.id,
            &StaffInput {
                name: "Bruno".to_string(),
                role: Some(StaffRole::Gerente),
            },
        )
        .await
        .unwrap();

        let listed = list_staff(&pool).await.unwrap();
        assert_eq!(listed[0].name, "Ana");
        assert_eq!(listed[1].role, StaffRole::Gerente);
    }

    #[tokio::test]
    async fn test_update_without_role_keeps_stored_role() {
        let (_dir, pool) = fresh_pool().await;
        let ana = create_staff(
            &pool,
            &StaffInput {
                name: "Ana".to_string(),
                role: Some(StaffRole::Gerente),
            },
        )
        .await
        .unwrap();

        let renamed = update_staff(
            &pool,
            ana.id,
            &StaffInput {
                name: "Ana María".to_string(),
                role: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(renamed.name, "Ana María");
        assert_eq!(renamed.role, StaffRole::Gerente);
        assert_eq!(list_staff(&pool).await.unwrap()[0].role, StaffRole::Gerente);

        let nobody = StaffInput {
            name: "Nadie".to_string(),
            role: None,
        };
        assert!(matches!(
            update_staff(&pool, Uuid::new_v4(), &nobody).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_name_and_missing_member() {
        let (_dir, pool) = fresh_pool().await;
        assert!(matches!(
            create_staff(&pool, &StaffInput::default()).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            delete_staff(&pool, Uuid::new_v4()).await,
            Err(Error::NotFound(_))
        ));
    }
}
