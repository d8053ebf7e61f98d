use std::{env, process::exit, sync::Arc};

use dotenv::dotenv;
use school_board::{
    models::categories::GENERAL_CATEGORY_SLUG,
    repositories::{posts_repo::PostsRepository, PostgresRepo},
    services::categories::CategoryService,
    Result,
};
use sqlx::postgres::PgPoolOptions;

const USAGE: &str = "usage: setup_categories\n       setup_categories add <name> [description] [color]\n       setup_categories remove <slug>";

enum Command {
    Setup,
    Add {
        name: String,
        description: Option<String>,
        color: Option<String>,
    },
    Remove(String),
}

fn parse_args() -> Option<Command> {
    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        None => Some(Command::Setup),
        Some("add") => Some(Command::Add {
            name: args.next()?,
            description: args.next(),
            color: args.next(),
        }),
        Some("remove") => args.next().map(Command::Remove),
        Some(_) => None,
    }
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

    println!("📋 Running migrations...");
    if let Err(err) = sqlx::migrate!("./migrations").run(&pool).await {
        eprintln!("🔥 Failed to run database migrations: {:?}", err);
        exit(1);
    }

    let repo = Arc::new(PostgresRepo::new(pool.clone()));
    let categories = CategoryService::new(repo.clone());

    let outcome = match command {
        Command::Setup => setup(&categories, repo.as_ref()).await,
        Command::Add {
            name,
            description,
            color,
        } => categories
            .create(&name, description.as_deref(), color.as_deref())
            .await
            .map(|category| {
                println!(
                    "✅ Category '{}' added as /category/{}",
                    category.name, category.slug
                )
            }),
        Command::Remove(slug) => remove(&categories, &slug).await,
    };

    pool.close().await;

    if let Err(err) = outcome {
        eprintln!("🔥 Category setup failed: {:?}", err);
        exit(1);
    }
}

async fn setup(categories: &CategoryService, posts: &dyn PostsRepository) -> Result<()> {
    println!("📝 Ensuring default categories...");
    for category in categories.ensure_defaults().await? {
        println!("   ➕ {} ({})", category.name, category.slug);
    }

    println!("🔄 Filing uncategorized posts under '{GENERAL_CATEGORY_SLUG}'...");
    let moved = categories.assign_uncategorized(GENERAL_CATEGORY_SLUG).await?;
    println!("   {moved} post(s) updated");

    println!("✅ Category setup complete");
    for count in categories.counts_by_category().await? {
        println!("   {:<16} {:>4} active post(s)", count.name, count.post_count);
    }
    let totals = posts.post_counts().await?;
    println!(
        "📊 {} categories, {} posts",
        categories.list_active().await?.len(),
        totals.total_posts
    );

    Ok(())
}

async fn remove(categories: &CategoryService, slug: &str) -> Result<()> {
    let Some(category) = categories.get_by_slug(slug).await? else {
        println!("⚠️  No active category with slug '{slug}'");
        return Ok(());
    };

    categories.delete(category.id).await?;
    println!("🗑️  Category '{}' removed, its posts are now uncategorized", category.name);

    Ok(())
}
