// src/commands/channel.rs

//! `streamrec channel {add|add-category|list|list-categories}`.

use crate::cli::ChannelAction;
use crate::commands::{render_table, AppContext};
use crate::errors::{RecorderError, Result};
use crate::model::{Category, NewChannel};

pub async fn handle(ctx: &AppContext, action: ChannelAction) -> Result<()> {
    match action {
        ChannelAction::Add {
            name,
            url,
            category,
            create_category,
            update,
        } => add_channel(ctx, &name, &url, category.as_deref(), create_category, update),
        ChannelAction::AddCategory { name } => add_category(ctx, &name),
        ChannelAction::List { count } => list_channels(ctx, count),
        ChannelAction::ListCategories { count } => list_categories(ctx, count),
    }
}

fn add_category(ctx: &AppContext, name: &str) -> Result<()> {
    if ctx.store.category_by_name(name).is_some() {
        println!("Category already exists: {name}");
        return Ok(());
    }
    ctx.store.insert_category(name)?;
    println!("Category created: {name}");
    Ok(())
}

fn add_channel(
    ctx: &AppContext,
    name: &str,
    url: &str,
    category: Option<&str>,
    create_category: bool,
    update: bool,
) -> Result<()> {
    let category_id = match category {
        Some(cat_name) => Some(resolve_category(ctx, cat_name, create_category)?.id),
        None => None,
    };

    match ctx.store.channel_by_name(name) {
        Some(existing) if update => {
            ctx.store.update_channel(existing.id, url, category_id)?;
            println!("Channel updated");
        }
        Some(_) => {
            println!("Channel already exists");
        }
        None => {
            ctx.store.insert_channel(NewChannel {
                name: name.to_string(),
                url: url.to_string(),
                category: category_id,
            })?;
            println!("Channel created");
        }
    }
    Ok(())
}

fn resolve_category(ctx: &AppContext, name: &str, create: bool) -> Result<Category> {
    if let Some(category) = ctx.store.category_by_name(name) {
        return Ok(category);
    }
    if create {
        let category = ctx.store.insert_category(name)?;
        println!("Category created: {name}");
        return Ok(category);
    }
    Err(RecorderError::Validation(format!(
        "category '{name}' not found (use --create-category)"
    )))
}

fn list_channels(ctx: &AppContext, count: usize) -> Result<()> {
    let channels = ctx.store.channels();

    let rows: Vec<Vec<String>> = channels
        .iter()
        .take(count)
        .map(|ch| {
            let category = ch
                .category
                .and_then(|id| ctx.store.category(id).ok())
                .map(|c| c.name)
                .unwrap_or_default();
            vec![ch.id.to_string(), ch.name.clone(), category, ch.url.clone()]
        })
        .collect();

    print!("{}", render_table(&["id", "Name", "Category", "URL"], &rows));
    Ok(())
}

fn list_categories(ctx: &AppContext, count: usize) -> Result<()> {
    let categories = ctx.store.categories();

    let rows: Vec<Vec<String>> = categories
        .iter()
        .take(count)
        .map(|c| {
            vec![
                c.id.to_string(),
                c.name.clone(),
                ctx.store.channel_count(c.id).to_string(),
            ]
        })
        .collect();

    print!("{}", render_table(&["id", "Name", "Channel Count"], &rows));
    Ok(())
}
