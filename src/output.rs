//! Report Formatting
//!
//! CSV rows for follow listings and user lookups, and the detailed single
//! user record. Timestamps are always printed in UTC.

use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::collections::HashSet;
use std::io::{self, Write};

use crate::helix::{FollowEntry, User};
use crate::pagination::Page;

/// `YYYY-MM-DD HH:MM:SS`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const FOLLOW_HEADER: &str = "#,Followed at (UTC),ID,Login,Display Name";
pub const USER_HEADER: &str = "Created at (UTC),ID,Login,Display Name";

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Quote a CSV field when it contains a separator, quote or line break
pub fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Streams follow pages as numbered CSV rows
pub struct FollowCsv<W: Write> {
    out: W,
    width: usize,
    written: usize,
}

impl<W: Write> FollowCsv<W> {
    /// The row counter is zero-padded to the number of digits in `limit`
    pub fn new(out: W, limit: Option<usize>) -> Self {
        let width = limit.map(|l| l.to_string().len()).unwrap_or(0);
        Self {
            out,
            width,
            written: 0,
        }
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", FOLLOW_HEADER)
    }

    pub fn write_page(&mut self, page: &Page<FollowEntry>) -> io::Result<()> {
        for entry in page.items() {
            self.written += 1;
            writeln!(
                self.out,
                "{:0width$},{},{},{},{}",
                self.written,
                format_timestamp(&entry.followed_at),
                csv_field(&entry.id),
                csv_field(&entry.login),
                csv_field(&entry.display_name),
                width = self.width
            )?;
        }
        self.out.flush()
    }

    /// Rows written so far
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Ordering for multi-user lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum UserSort {
    /// Oldest account first
    Date,
    /// Alphabetical by login
    Name,
}

pub fn sort_users(users: &mut [User], sort: Option<UserSort>) {
    match sort {
        Some(UserSort::Date) => users.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        Some(UserSort::Name) => users.sort_by(|a, b| a.login.cmp(&b.login)),
        None => {}
    }
}

/// Requested names (or ids) that did not come back, compared case-insensitively
pub fn missing_users(requested: &[String], found: &[User], by_id: bool) -> Vec<String> {
    let found: HashSet<String> = found
        .iter()
        .map(|u| {
            if by_id {
                u.id.to_lowercase()
            } else {
                u.login.to_lowercase()
            }
        })
        .collect();
    requested
        .iter()
        .filter(|r| !found.contains(&r.to_lowercase()))
        .cloned()
        .collect()
}

pub fn write_user_table<W: Write>(out: &mut W, users: &[User]) -> io::Result<()> {
    writeln!(out, "{}", USER_HEADER)?;
    for user in users {
        writeln!(
            out,
            "{},{},{},{}",
            format_timestamp(&user.created_at),
            csv_field(&user.id),
            csv_field(&user.login),
            csv_field(&user.display_name)
        )?;
    }
    Ok(())
}

pub fn write_missing<W: Write>(out: &mut W, missing: &[String]) -> io::Result<()> {
    if missing.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "{} users not found:", missing.len())?;
    for user in missing {
        writeln!(out, "{}", user)?;
    }
    Ok(())
}

pub fn write_user_detail<W: Write>(out: &mut W, user: &User) -> io::Result<()> {
    writeln!(out, "ID:               {}", user.id)?;
    writeln!(out, "Login:            {}", user.login)?;
    writeln!(out, "Display Name:     {}", user.display_name)?;
    writeln!(out, "Type:             {}", user.user_type)?;
    writeln!(out, "Broadcaster Type: {}", user.broadcaster_type)?;
    writeln!(out, "Description:      {}", user.description)?;
    writeln!(out, "Created at (UTC): {}", format_timestamp(&user.created_at))?;
    writeln!(out, "Profile Image:    {}", user.profile_image_url)
}
