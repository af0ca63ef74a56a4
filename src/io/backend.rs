// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Backend collaborator.
//!
//! Identity, tables, file storage and change notifications live behind the
//! `Backend` trait. `LocalBackend` implements it over a directory:
//!
//! ```text
//! <root>/storage/<path>          uploaded objects
//! <root>/tables/<table>.json     JSON array of rows
//! ```
//!
//! The free functions at the bottom are the social operations built on
//! the trait: publishing, the feed, likes, comments and profiles.

use crate::models::meme::{
    image_file_name, normalize_tag, MemeRecord, NewMeme, ValidDraft, MEMES_TABLE,
};
use crate::models::social::{
    avatar_file_name, Comment, FeedEntry, FeedFilter, Profile, ProfileUpdate, COMMENTS_TABLE,
    LIKES_TABLE,
};
use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Table holding one row per known user.
pub const PROFILES_TABLE: &str = "profiles";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

/// Row filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Column equals the value.
    Eq(String, Value),
    /// Array column contains every listed value.
    Contains(String, Vec<Value>),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::Eq(column.to_string(), value.into())
    }

    pub fn contains(column: &str, values: Vec<Value>) -> Self {
        Self::Contains(column.to_string(), values)
    }

    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Self::Eq(column, value) => row.get(column) == Some(value),
            Self::Contains(column, values) => match row.get(column).and_then(Value::as_array) {
                Some(items) => values.iter().all(|v| items.contains(v)),
                None => false,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row change delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct TableChange {
    pub table: String,
    pub kind: ChangeKind,
    pub row: Value,
}

pub type AuthCallback = Box<dyn FnMut(Option<&User>)>;
pub type ChangeCallback = Box<dyn FnMut(&TableChange)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub trait Backend {
    fn current_user(&self) -> Option<User>;

    /// Register a listener for sign-in and sign-out.
    fn on_auth_change(&mut self, callback: AuthCallback);

    fn sign_in(&mut self, username: &str) -> Result<User>;

    fn sign_out(&mut self) -> Result<()>;

    /// Store `bytes` at `path` and return a public URL for them.
    fn upload_image(&mut self, bytes: &[u8], path: &str) -> Result<String>;

    /// Insert a row and return it as stored.
    fn insert(&mut self, table: &str, row: Value) -> Result<Value>;

    fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>>;

    /// Merge `changes` into every matching row. Returns the number updated.
    fn update(&mut self, table: &str, filters: &[Filter], changes: Value) -> Result<usize>;

    /// Remove every matching row. Returns the number removed.
    fn delete(&mut self, table: &str, filters: &[Filter]) -> Result<usize>;

    fn subscribe(
        &mut self,
        table: &str,
        filter: Option<Filter>,
        on_change: ChangeCallback,
    ) -> SubscriptionId;

    fn unsubscribe(&mut self, id: SubscriptionId);
}

struct Subscription {
    id: SubscriptionId,
    table: String,
    filter: Option<Filter>,
    callback: ChangeCallback,
}

/// Directory-backed backend for running without a hosted service.
pub struct LocalBackend {
    root: PathBuf,
    user: Option<User>,
    auth_listeners: Vec<AuthCallback>,
    subscriptions: Vec<Subscription>,
    next_subscription: u64,
}

impl std::fmt::Debug for LocalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBackend")
            .field("root", &self.root)
            .field("user", &self.user)
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl LocalBackend {
    pub fn open(root: &Path) -> Result<Self> {
        for dir in ["storage", "tables"] {
            std::fs::create_dir_all(root.join(dir))
                .with_context(|| format!("creating {}", root.join(dir).display()))?;
        }
        Ok(Self {
            root: root.to_path_buf(),
            user: None,
            auth_listeners: Vec::new(),
            subscriptions: Vec::new(),
            next_subscription: 1,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn table_path(&self, table: &str) -> Result<PathBuf> {
        if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            bail!("invalid table name {table:?}");
        }
        Ok(self.root.join("tables").join(format!("{table}.json")))
    }

    fn load_table(&self, table: &str) -> Result<Vec<Value>> {
        let path = self.table_path(table)?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))
    }

    fn save_table(&self, table: &str, rows: &[Value]) -> Result<()> {
        let path = self.table_path(table)?;
        let json = serde_json::to_string_pretty(rows)?;
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))
    }

    fn notify(&mut self, change: TableChange) {
        for sub in &mut self.subscriptions {
            if sub.table != change.table {
                continue;
            }
            if sub.filter.as_ref().is_some_and(|f| !f.matches(&change.row)) {
                continue;
            }
            (sub.callback)(&change);
        }
    }

    fn set_user(&mut self, user: Option<User>) {
        self.user = user;
        for listener in &mut self.auth_listeners {
            listener(self.user.as_ref());
        }
    }
}

fn matches_all(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|f| f.matches(row))
}

/// Resolve a storage path, rejecting anything that escapes the storage root.
fn storage_relative(path: &str) -> Result<PathBuf> {
    let relative = Path::new(path);
    let mut clean = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => bail!("invalid storage path {path:?}"),
        }
    }
    if clean.as_os_str().is_empty() {
        bail!("empty storage path");
    }
    Ok(clean)
}

pub fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

impl Backend for LocalBackend {
    fn current_user(&self) -> Option<User> {
        self.user.clone()
    }

    fn on_auth_change(&mut self, callback: AuthCallback) {
        self.auth_listeners.push(callback);
    }

    fn sign_in(&mut self, username: &str) -> Result<User> {
        let username = username.trim();
        if username.is_empty() {
            bail!("username must not be empty");
        }

        let existing = self.select(PROFILES_TABLE, &[Filter::eq("username", username)])?;
        let row = match existing.into_iter().next() {
            Some(row) => row,
            None => self.insert(PROFILES_TABLE, json!({ "username": username }))?,
        };
        let user: User = serde_json::from_value(row).context("reading profile")?;

        self.set_user(Some(user.clone()));
        Ok(user)
    }

    fn sign_out(&mut self) -> Result<()> {
        self.set_user(None);
        Ok(())
    }

    fn upload_image(&mut self, bytes: &[u8], path: &str) -> Result<String> {
        let target = self.root.join("storage").join(storage_relative(path)?);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::write(&target, bytes).with_context(|| format!("writing {}", target.display()))?;

        let absolute = std::fs::canonicalize(&target).unwrap_or(target);
        Ok(format!("file://{}", absolute.display()))
    }

    fn insert(&mut self, table: &str, row: Value) -> Result<Value> {
        let mut fields: Map<String, Value> = match row {
            Value::Object(fields) => fields,
            other => return Err(anyhow!("rows must be objects, got {other}")),
        };
        fields
            .entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        fields
            .entry("created_at")
            .or_insert_with(|| Value::from(now_millis() as u64));
        let row = Value::Object(fields);

        let mut rows = self.load_table(table)?;
        rows.push(row.clone());
        self.save_table(table, &rows)?;

        self.notify(TableChange {
            table: table.to_string(),
            kind: ChangeKind::Insert,
            row: row.clone(),
        });
        Ok(row)
    }

    fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>> {
        Ok(self
            .load_table(table)?
            .into_iter()
            .filter(|row| matches_all(row, filters))
            .collect())
    }

    fn update(&mut self, table: &str, filters: &[Filter], changes: Value) -> Result<usize> {
        let Value::Object(changes) = changes else {
            bail!("changes must be an object");
        };

        let mut rows = self.load_table(table)?;
        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|row| matches_all(row, filters)) {
            if let Value::Object(fields) = row {
                for (key, value) in &changes {
                    fields.insert(key.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }
        if updated.is_empty() {
            return Ok(0);
        }
        self.save_table(table, &rows)?;

        let count = updated.len();
        for row in updated {
            self.notify(TableChange {
                table: table.to_string(),
                kind: ChangeKind::Update,
                row,
            });
        }
        Ok(count)
    }

    fn delete(&mut self, table: &str, filters: &[Filter]) -> Result<usize> {
        let rows = self.load_table(table)?;
        let (removed, kept): (Vec<Value>, Vec<Value>) =
            rows.into_iter().partition(|row| matches_all(row, filters));
        if removed.is_empty() {
            return Ok(0);
        }
        self.save_table(table, &kept)?;

        let count = removed.len();
        for row in removed {
            self.notify(TableChange {
                table: table.to_string(),
                kind: ChangeKind::Delete,
                row,
            });
        }
        Ok(count)
    }

    fn subscribe(
        &mut self,
        table: &str,
        filter: Option<Filter>,
        on_change: ChangeCallback,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscriptions.push(Subscription {
            id,
            table: table.to_string(),
            filter,
            callback: on_change,
        });
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscriptions.retain(|sub| sub.id != id);
    }
}

/// Upload the exported image and insert the meme row.
pub fn create_meme(
    backend: &mut dyn Backend,
    draft: &ValidDraft<'_>,
    user: &User,
    timestamp_millis: u128,
) -> Result<MemeRecord> {
    let image_url = backend
        .upload_image(draft.image, &image_file_name(timestamp_millis))
        .context("uploading meme image")?;

    let meme = NewMeme {
        title: draft.title.clone(),
        image_url,
        tags: draft.tags.clone(),
        creator_id: user.id.clone(),
    };
    let row = backend
        .insert(MEMES_TABLE, serde_json::to_value(&meme)?)
        .context("saving meme")?;

    serde_json::from_value(row).context("reading saved meme")
}

fn rows_as<T: DeserializeOwned>(rows: Vec<Value>, what: &str) -> Result<Vec<T>> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<_, _>>()
        .with_context(|| format!("reading {what}"))
}

/// Order rows newest first. Rows stored in the same millisecond keep
/// reverse insertion order.
fn newest_first<T>(mut items: Vec<T>, created_at: impl Fn(&T) -> u64) -> Vec<T> {
    items.reverse();
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    items
}

fn find_meme(backend: &dyn Backend, meme_id: &str) -> Result<MemeRecord> {
    let rows = backend
        .select(MEMES_TABLE, &[Filter::eq("id", meme_id)])
        .context("looking up meme")?;
    rows_as::<MemeRecord>(rows, "meme")?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("meme {meme_id} not found"))
}

/// Published memes, newest first, with the viewer's likes marked.
pub fn fetch_memes(
    backend: &dyn Backend,
    filter: &FeedFilter,
    viewer: Option<&User>,
) -> Result<Vec<FeedEntry>> {
    let mut filters = Vec::new();
    if let Some(creator) = &filter.creator_id {
        filters.push(Filter::eq("creator_id", creator.as_str()));
    }
    if let Some(tag) = filter.tag.as_deref().map(normalize_tag).filter(|t| !t.is_empty()) {
        filters.push(Filter::contains("tags", vec![Value::from(tag)]));
    }
    let rows = backend.select(MEMES_TABLE, &filters).context("fetching memes")?;
    let memes = newest_first(rows_as::<MemeRecord>(rows, "memes")?, |m| m.created_at);

    let liked: HashSet<String> = match viewer {
        Some(user) => backend
            .select(LIKES_TABLE, &[Filter::eq("user_id", user.id.as_str())])
            .context("fetching likes")?
            .iter()
            .filter_map(|row| row["meme_id"].as_str().map(str::to_string))
            .collect(),
        None => HashSet::new(),
    };
    let usernames: HashMap<String, String> =
        rows_as::<Profile>(backend.select(PROFILES_TABLE, &[])?, "profiles")?
            .into_iter()
            .map(|p| (p.id, p.username))
            .collect();

    Ok(memes
        .into_iter()
        .map(|meme| FeedEntry {
            liked: liked.contains(&meme.id),
            creator: usernames.get(&meme.creator_id).cloned(),
            meme,
        })
        .collect())
}

/// Like or unlike a meme for `user`. Returns whether it is now liked.
///
/// The meme's `likes_count` is recomputed from the likes table.
pub fn toggle_like(backend: &mut dyn Backend, meme_id: &str, user: &User) -> Result<bool> {
    find_meme(backend, meme_id)?;

    let own_like = [
        Filter::eq("user_id", user.id.as_str()),
        Filter::eq("meme_id", meme_id),
    ];
    let liked = backend.select(LIKES_TABLE, &own_like)?.is_empty();
    if liked {
        backend
            .insert(LIKES_TABLE, json!({ "user_id": user.id, "meme_id": meme_id }))
            .context("saving like")?;
    } else {
        backend.delete(LIKES_TABLE, &own_like).context("removing like")?;
    }

    let count = backend
        .select(LIKES_TABLE, &[Filter::eq("meme_id", meme_id)])?
        .len();
    backend
        .update(MEMES_TABLE, &[Filter::eq("id", meme_id)], json!({ "likes_count": count }))
        .context("updating like count")?;
    Ok(liked)
}

/// Comments on a meme, newest first.
pub fn fetch_comments(backend: &dyn Backend, meme_id: &str) -> Result<Vec<Comment>> {
    let rows = backend
        .select(COMMENTS_TABLE, &[Filter::eq("meme_id", meme_id)])
        .context("fetching comments")?;
    Ok(newest_first(rows_as::<Comment>(rows, "comments")?, |c| c.created_at))
}

pub fn add_comment(
    backend: &mut dyn Backend,
    meme_id: &str,
    user: &User,
    content: &str,
) -> Result<Comment> {
    let content = content.trim();
    if content.is_empty() {
        bail!("comment must not be empty");
    }
    find_meme(backend, meme_id)?;

    let row = backend
        .insert(
            COMMENTS_TABLE,
            json!({ "meme_id": meme_id, "user_id": user.id, "content": content }),
        )
        .context("saving comment")?;
    serde_json::from_value(row).context("reading saved comment")
}

/// Delete one of `user`'s own comments.
pub fn delete_comment(backend: &mut dyn Backend, comment_id: &str, user: &User) -> Result<()> {
    let by_id = [Filter::eq("id", comment_id)];
    let comment = rows_as::<Comment>(backend.select(COMMENTS_TABLE, &by_id)?, "comment")?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("comment {comment_id} not found"))?;
    if comment.user_id != user.id {
        bail!("you can only delete your own comments");
    }
    backend.delete(COMMENTS_TABLE, &by_id).context("deleting comment")?;
    Ok(())
}

pub fn fetch_profile(backend: &dyn Backend, user_id: &str) -> Result<Option<Profile>> {
    let rows = backend
        .select(PROFILES_TABLE, &[Filter::eq("id", user_id)])
        .context("fetching profile")?;
    Ok(rows_as::<Profile>(rows, "profile")?.into_iter().next())
}

/// Apply `update` to `user`'s profile and return the stored result.
///
/// Usernames are trimmed and must be unique.
pub fn update_profile(
    backend: &mut dyn Backend,
    user: &User,
    update: &ProfileUpdate,
) -> Result<Profile> {
    let mut changes = Map::new();
    if let Some(username) = &update.username {
        let username = username.trim();
        if username.is_empty() {
            bail!("username must not be empty");
        }
        let taken = backend
            .select(PROFILES_TABLE, &[Filter::eq("username", username)])?
            .iter()
            .any(|row| row["id"].as_str() != Some(user.id.as_str()));
        if taken {
            bail!("username {username:?} is already taken");
        }
        changes.insert("username".to_string(), Value::from(username));
    }

    if !changes.is_empty() {
        let updated = backend
            .update(PROFILES_TABLE, &[Filter::eq("id", user.id.as_str())], Value::Object(changes))
            .context("updating profile")?;
        if updated == 0 {
            bail!("profile {} not found", user.id);
        }
    }
    fetch_profile(backend, &user.id)?.ok_or_else(|| anyhow!("profile {} not found", user.id))
}

/// Store a new avatar for `user` and point their profile at it.
pub fn upload_avatar(
    backend: &mut dyn Backend,
    user: &User,
    bytes: &[u8],
    extension: &str,
    timestamp_millis: u128,
) -> Result<String> {
    let url = backend
        .upload_image(bytes, &avatar_file_name(&user.id, timestamp_millis, extension))
        .context("uploading avatar")?;
    let updated = backend
        .update(
            PROFILES_TABLE,
            &[Filter::eq("id", user.id.as_str())],
            json!({ "avatar_url": url }),
        )
        .context("updating profile")?;
    if updated == 0 {
        bail!("profile {} not found", user.id);
    }
    Ok(url)
}
