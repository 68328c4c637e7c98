use sea_orm_migration::prelude::*;
use sha2::Digest as _;

use crate::m20250810_091500_init::{Department, Employee, User};

#[derive(DeriveMigrationName)]
pub struct Migration;

const DEPARTMENTS: [(&str, &str); 4] = [
    ("Engineering", "Product development and infrastructure"),
    ("Human Resources", "People operations"),
    ("Finance", "Accounting and payroll"),
    ("Sales", "Revenue and customer accounts"),
];

const STAFF: [(&str, &str, &str); 2] = [
    ("Admin", "admin@example.com", "admin"),
    ("HR Manager", "hr@example.com", "hr"),
];

const EMPLOYEES: [(&str, &str, &str, &str); 3] = [
    ("Alice Johnson", "alice@example.com", "Software Engineer", "Engineering"),
    ("Bob Smith", "bob@example.com", "Accountant", "Finance"),
    ("Carol White", "carol@example.com", "Sales Executive", "Sales"),
];

fn hashed_password(email: &str) -> Vec<u8> {
    // Seeded accounts log in with "password123"
    sha2::Sha256::digest(format!("password123:{email}")).to_vec()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let time = Expr::val("2025-08-12T14:18:12.000Z").cast_as("timestamptz");

        for (name, description) in DEPARTMENTS {
            manager
                .exec_stmt(Query::insert()
                    .into_table(Department::Table)
                    .columns(["created_at", "updated_at", "name", "description"])
                    .values_panic([time.clone().into(), time.clone().into(), name.into(), description.into()])
                    .to_owned()
            ).await?;
        }

        for (name, email, role) in STAFF {
            manager
                .exec_stmt(Query::insert()
                    .into_table(User::Table)
                    .columns(["created_at", "updated_at", "name", "email", "password", "role"])
                    .values_panic([time.clone().into(), time.clone().into(), name.into(), email.into(), hashed_password(email).into(), Expr::val(role).cast_as("role_type").into()])
                    .to_owned()
            ).await?;
        }

        for (name, email, designation, department) in EMPLOYEES {
            let salary: i64 = rand::random_range(3_000..=8_000);

            manager
                .exec_stmt(Query::insert()
                    .into_table(User::Table)
                    .columns(["created_at", "updated_at", "name", "email", "password", "role"])
                    .values_panic([time.clone().into(), time.clone().into(), name.into(), email.into(), hashed_password(email).into(), Expr::val("employee").cast_as("role_type").into()])
                    .to_owned()
            ).await?;

            // Serial keys are assigned by the database, so foreign keys are
            // resolved by subquery instead of hardcoded ids
            manager
                .exec_stmt(Query::insert()
                    .into_table(Employee::Table)
                    .columns(["created_at", "updated_at", "user_id", "department_id", "name", "email", "designation", "salary", "joining_date"])
                    .values_panic([
                        time.clone().into(),
                        time.clone().into(),
                        Expr::cust(format!("(SELECT \"id\" FROM \"user\" WHERE \"email\" = '{email}')")).into(),
                        Expr::cust(format!("(SELECT \"id\" FROM \"department\" WHERE \"name\" = '{department}')")).into(),
                        name.into(),
                        email.into(),
                        designation.into(),
                        salary.into(),
                        Expr::val("2024-01-15").cast_as("date").into(),
                    ])
                    .to_owned()
            ).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (_, email, _, _) in EMPLOYEES {
            manager
                .exec_stmt(Query::delete()
                    .from_table(Employee::Table)
                    .and_where(Expr::col("email").eq(email))
                    .to_owned()
            ).await?;
        }

        for email in EMPLOYEES.map(|(_, email, _, _)| email).into_iter().chain(STAFF.map(|(_, email, _)| email)) {
            manager
                .exec_stmt(Query::delete()
                    .from_table(User::Table)
                    .and_where(Expr::col("email").eq(email))
                    .to_owned()
            ).await?;
        }

        for (name, _) in DEPARTMENTS {
            manager
                .exec_stmt(Query::delete()
                    .from_table(Department::Table)
                    .and_where(Expr::col("name").eq(name))
                    .to_owned()
            ).await?;
        }

        Ok(())
    }
}
