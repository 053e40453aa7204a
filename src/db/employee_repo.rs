// src/db/employee_repo.rs

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{auth::UserRole, employee::NewEmployee},
    services::employee_service::EmployeeProvisioner,
};

#[derive(Clone)]
pub struct EmployeeRepository {
    pool: PgPool,
}

impl EmployeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        email: &str,
        password_hash: &str,
        full_name: &str,
        role: UserRole,
    ) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (email, password_hash, full_name, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
            .bind(email)
            .bind(password_hash)
            .bind(full_name)
            .bind(role)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                // Converte erro de violação de chave única em um erro mais amigável
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        return AppError::EmailAlreadyExists;
                    }
                }
                AppError::DatabaseError(e)
            })
    }

    pub async fn create_employee_profile<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        employee: &NewEmployee,
    ) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO employees (user_id, full_name, position, phone, address, date_of_birth, group_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
            .bind(user_id)
            .bind(&employee.full_name)
            .bind(&employee.position)
            .bind(employee.phone.as_deref())
            .bind(employee.address.as_deref())
            .bind(employee.date_of_birth)
            .bind(employee.group_id)
            .fetch_one(executor)
            .await?;

        Ok(id)
    }
}

#[async_trait]
impl EmployeeProvisioner for EmployeeRepository {
    /// Usuário + funcionário na mesma transação: se um falhar, nada fica gravado.
    async fn provision(&self, employee: NewEmployee) -> Result<Uuid, AppError> {
        let mut tx = self.pool.begin().await?;

        let user_id = self
            .create_user(
                &mut *tx,
                &employee.email,
                &employee.password_hash,
                &employee.full_name,
                employee.role,
            )
            .await?; // rollback automático ao sair do escopo (drop)

        let employee_id = self
            .create_employee_profile(&mut *tx, user_id, &employee)
            .await?;

        tx.commit().await?;

        Ok(employee_id)
    }
}
