use std::{env, process::exit, sync::Arc};

use dotenv::dotenv;
use school_board::{
    models::users::{CreateAdminDto, ResetPasswordDto},
    repositories::PostgresRepo,
    services::auth::AuthService,
    Error,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use validator::Validate;

const USAGE: &str = "usage: create_admin <username> <password> [email]\n       create_admin --reset-password <username> <password>";

enum Command {
    Create(CreateAdminDto),
    ResetPassword(ResetPasswordDto),
}

fn parse_args() -> Option<Command> {
    let mut args = env::args().skip(1);
    let first = args.next()?;

    if first == "--reset-password" {
        let (Some(username), Some(password)) = (args.next(), args.next()) else {
            return None;
        };
        return Some(Command::ResetPassword(ResetPasswordDto { username, password }));
    }

    let password = args.next()?;
    Some(Command::Create(CreateAdminDto {
        username: first,
        password,
        email: args.next(),
    }))
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "school_board=info".into()),
        )
        .init();

    let Some(command) = parse_args() else {
        eprintln!("{USAGE}");
        exit(2);
    };

    let validation = match &command {
        Command::Create(dto) => dto.validate(),
        Command::ResetPassword(dto) => dto.validate(),
    };
    if let Err(errors) = validation {
        eprintln!("🔥 Invalid admin user: {errors}");
        exit(2);
    }

    let pool = connect().await;
    let repo = Arc::new(PostgresRepo::new(pool.clone()));
    let session_secret = env::var("SESSION_SECRET").unwrap_or_default();
    let auth = AuthService::new(repo.clone(), repo, session_secret, 24);

    let outcome = match &command {
        Command::Create(dto) => auth
            .create_user(&dto.username, &dto.password, dto.email.as_deref())
            .await
            .map(|user_id| format!("✅ Admin user '{}' created with id {user_id}", dto.username)),
        Command::ResetPassword(dto) => auth
            .reset_password(&dto.username, &dto.password)
            .await
            .map(|_| format!("✅ Password updated for admin user '{}'", dto.username)),
    };

    pool.close().await;

    match outcome {
        Ok(message) => println!("{message}"),
        Err(Error::NotFound) => {
            eprintln!("🔥 No admin user with that username");
            exit(1);
        }
        Err(err) => {
            eprintln!("🔥 Could not save admin user: {:?}", err);
            exit(1);
        }
    }
}

async fn connect() -> PgPool {
    let Ok(database_url) = env::var("DATABASE_URL") else {
        eprintln!("🔥 DATABASE_URL must be set");
        exit(1);
    };

    let pool = match PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
    {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("🔥 Failed to connect to the database: {:?}", err);
            exit(1);
        }
    };

    if let Err(err) = sqlx::migrate!("./migrations").run(&pool).await {
        eprintln!("🔥 Failed to run database migrations: {:?}", err);
        exit(1);
    }

    pool
}
