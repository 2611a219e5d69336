//! Difficulty retarget progress, from mempool.space's
//! `/v1/difficulty-adjustment` endpoint. No other configured provider exposes
//! an equivalent, so this chain has a single entry.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::client::parse_json;
use crate::constants::DIFFICULTY_TTL_SECS;
use crate::context::AppContext;
use crate::diff::Diff;
use crate::error::{CommandError, ProviderError};
use crate::operation::Operation;
use crate::providers::Provider;

/// Progress toward the next difficulty retarget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifficultyAdjustment {
    /// Percent of the current epoch already mined.
    pub progress_percent: f64,
    /// Estimated difficulty change at the retarget, in percent.
    pub difficulty_change: f64,
    pub estimated_retarget_date: DateTime<Utc>,
    pub remaining_blocks: u64,
    pub remaining_time_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifficultyDelta {
    pub progress_percent_change: f64,
    /// How far the change estimate moved between polls.
    pub difficulty_change_drift: f64,
    pub remaining_blocks_change: i64,
}

impl Diff for DifficultyAdjustment {
    type Delta = DifficultyDelta;

    fn diff(&self, previous: &Self) -> DifficultyDelta {
        DifficultyDelta {
            progress_percent_change: self.progress_percent - previous.progress_percent,
            difficulty_change_drift: self.difficulty_change - previous.difficulty_change,
            remaining_blocks_change: self.remaining_blocks as i64
                - previous.remaining_blocks as i64,
        }
    }
}

/// mempool.space `/v1/difficulty-adjustment` response shape. Timestamps and
/// durations arrive in milliseconds.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DifficultyAdjustmentRaw {
    progress_percent: f64,
    difficulty_change: f64,
    estimated_retarget_date: i64,
    remaining_blocks: u64,
    remaining_time: i64,
}

fn parse(provider: &Provider, body: &str) -> Result<DifficultyAdjustment, ProviderError> {
    let raw: DifficultyAdjustmentRaw = parse_json(provider, body)?;
    let estimated_retarget_date = Utc
        .timestamp_millis_opt(raw.estimated_retarget_date)
        .single()
        .ok_or_else(|| {
            ProviderError::invalid(format!(
                "retarget timestamp out of range: {}",
                raw.estimated_retarget_date
            ))
        })?;
    Ok(DifficultyAdjustment {
        progress_percent: raw.progress_percent,
        difficulty_change: raw.difficulty_change,
        estimated_retarget_date,
        remaining_blocks: raw.remaining_blocks,
        remaining_time_secs: (raw.remaining_time / 1000).max(0) as u64,
    })
}

/// `chainwatch difficulty`
pub struct DifficultyCommand;

#[async_trait]
impl Operation for DifficultyCommand {
    type Output = DifficultyAdjustment;

    fn name(&self) -> &'static str {
        "difficulty"
    }

    async fn fetch(&self, ctx: &AppContext) -> Result<DifficultyAdjustment, CommandError> {
        let adjustment = ctx
            .cache
            .get_or_fetch(
                "difficulty",
                Duration::from_secs(DIFFICULTY_TTL_SECS),
                || async {
                    ctx.client
                        .fetch("/v1/difficulty-adjustment", &ctx.providers.difficulty, parse)
                        .await
                },
            )
            .await?;
        Ok(adjustment)
    }

    fn render(&self, data: &DifficultyAdjustment, previous: Option<&DifficultyAdjustment>) -> String {
        let delta = previous.map(|prev| data.diff(prev));
        let mut out = String::from("difficulty adjustment\n");

        match delta.as_ref().map(|d| d.progress_percent_change) {
            Some(change) if change != 0.0 => {
                let _ = writeln!(
                    out,
                    "  progress          {:.1}% ({change:+.1})",
                    data.progress_percent
                );
            }
            _ => {
                let _ = writeln!(out, "  progress          {:.1}%", data.progress_percent);
            }
        }

        let _ = writeln!(out, "  estimated change  {:+.2}%", data.difficulty_change);

        match delta.as_ref().map(|d| d.remaining_blocks_change) {
            Some(change) if change != 0 => {
                let _ = writeln!(
                    out,
                    "  remaining blocks  {} ({change:+})",
                    data.remaining_blocks
                );
            }
            _ => {
                let _ = writeln!(out, "  remaining blocks  {}", data.remaining_blocks);
            }
        }

        let _ = writeln!(
            out,
            "  retarget date     {}",
            data.estimated_retarget_date.format("%Y-%m-%d %H:%M UTC")
        );
        out.trim_end().to_string()
    }
}
