//! PathTimeCodec: tenant and creation instant out of a partition path.
//!
//! Layout (from the scan root down):
//!
//! ```text
//! <tenant>/[<device>/]<YYYY>/<MM>/<DD>/<HH>/<mm>
//! ```
//!
//! Only the trailing components matter, so absolute paths with any prefix
//! decode the same way. All instants are UTC.

use std::path::{Component, Path};

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::TenantId;
use crate::error::DecodeError;

/// Number of trailing time components (year, month, day, hour, minute).
pub const TIME_COMPONENTS: usize = 5;

/// Fixed directory schema for one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSchema {
    /// A device component sits between tenant and year.
    pub device_level: bool,
}

impl PathSchema {
    /// `tenant/device/YYYY/MM/DD/HH/mm`
    pub const fn with_device() -> Self {
        Self { device_level: true }
    }

    /// `tenant/YYYY/MM/DD/HH/mm`
    pub const fn without_device() -> Self {
        Self {
            device_level: false,
        }
    }

    /// Depth of a minute directory below the scan root.
    pub const fn depth(&self) -> usize {
        1 + self.device_level as usize + TIME_COMPONENTS
    }
}

impl Default for PathSchema {
    fn default() -> Self {
        Self::with_device()
    }
}

/// Result of a successful decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPath {
    pub tenant: TenantId,
    pub device: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PathTimeCodec {
    schema: PathSchema,
}

impl PathTimeCodec {
    pub fn new(schema: PathSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> PathSchema {
        self.schema
    }

    /// Decode `path` into tenant, optional device and creation instant.
    pub fn decode(&self, path: &Path) -> Result<DecodedPath, DecodeError> {
        // root/prefix components are ignored, `..` in the leading part included
        let components: Vec<Component<'_>> = path
            .components()
            .filter(|c| matches!(c, Component::Normal(_) | Component::ParentDir))
            .collect();

        let depth = self.schema.depth();
        if components.len() < depth {
            return Err(DecodeError::malformed(
                path,
                format!("expected at least {depth} components, found {}", components.len()),
            ));
        }

        let mut tail = Vec::with_capacity(depth);
        for component in &components[components.len() - depth..] {
            match component {
                Component::Normal(os) => {
                    let s = os
                        .to_str()
                        .ok_or_else(|| DecodeError::malformed(path, "component is not UTF-8"))?;
                    tail.push(s);
                }
                _ => return Err(DecodeError::malformed(path, "contains '..'")),
            }
        }

        let tenant = TenantId::new(tail[0]);
        let device = self.schema.device_level.then(|| tail[1].to_string());
        let time = &tail[depth - TIME_COMPONENTS..];

        let field = |idx: usize, name: &str, min: u32, max: u32| {
            parse_field(time[idx], name, min, max)
                .map_err(|reason| DecodeError::malformed(path, reason))
        };
        let year = field(0, "year", 1970, u32::MAX)?;
        let month = field(1, "month", 1, 12)?;
        let day = field(2, "day", 1, 31)?;
        let hour = field(3, "hour", 0, 23)?;
        let minute = field(4, "minute", 0, 59)?;

        let created_at = to_utc(year, month, day, hour, minute)
            .ok_or_else(|| DecodeError::malformed(path, "timestamp out of range"))?;

        Ok(DecodedPath {
            tenant,
            device,
            created_at,
        })
    }
}

fn parse_field(s: &str, name: &str, min: u32, max: u32) -> Result<u32, String> {
    // u32 holds any 9-digit value
    if s.is_empty() || s.len() > 9 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("{name} {s:?} is not numeric"));
    }
    let value: u32 = s
        .parse()
        .map_err(|_| format!("{name} {s:?} is not numeric"))?;
    if value < min || value > max {
        return Err(format!("{name} {value} out of range"));
    }
    Ok(value)
}

/// Day-of-month is not checked against the month length: day 31 of a
/// 30-day month rolls over into the next month.
fn to_utc(year: u32, month: u32, day: u32, hour: u32, minute: u32) -> Option<DateTime<Utc>> {
    let year = i32::try_from(year).ok()?;
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let date = first.checked_add_days(Days::new(u64::from(day - 1)))?;
    Some(date.and_hms_opt(hour, minute, 0)?.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use std::path::PathBuf;

    fn codec() -> PathTimeCodec {
        PathTimeCodec::default()
    }

    #[test]
    fn decodes_tenant_device_and_utc_instant() {
        let decoded = codec()
            .decode(Path::new("/data/acme/devA/2023/01/01/00/00"))
            .unwrap();

        assert_eq!(decoded.tenant, TenantId::new("acme"));
        assert_eq!(decoded.device.as_deref(), Some("devA"));
        assert_eq!(
            decoded.created_at,
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn schema_without_device_uses_previous_component_as_tenant() {
        let codec = PathTimeCodec::new(PathSchema::without_device());
        let decoded = codec
            .decode(Path::new("/srv/store/1001/2024/06/15/13/45"))
            .unwrap();

        assert_eq!(decoded.tenant.as_str(), "1001");
        assert_eq!(decoded.device, None);
        assert_eq!(
            decoded.created_at,
            Utc.with_ymd_and_hms(2024, 6, 15, 13, 45, 0).unwrap()
        );
    }

    #[test]
    fn relative_paths_and_trailing_slash_are_accepted() {
        let decoded = codec()
            .decode(Path::new("acme/devA/2023/12/31/23/59/"))
            .unwrap();
        assert_eq!(
            decoded.created_at,
            Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 0).unwrap()
        );
    }

    #[rstest]
    #[case("/srv/x/../data/acme/devA/2023/01/01/00/00")]
    #[case("../data/acme/devA/2023/01/01/00/00")]
    #[case("./data/sub/../acme/devA/2023/01/01/00/00")]
    fn parent_dir_in_root_prefix_is_ignored(#[case] path: &str) {
        let decoded = codec().decode(Path::new(path)).unwrap();
        assert_eq!(decoded.tenant.as_str(), "acme");
        assert_eq!(
            decoded.created_at,
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn day_overflow_rolls_into_next_month() {
        let decoded = codec()
            .decode(Path::new("/data/acme/devA/2023/02/31/00/00"))
            .unwrap();
        assert_eq!(
            decoded.created_at,
            Utc.with_ymd_and_hms(2023, 3, 3, 0, 0, 0).unwrap()
        );
    }

    #[rstest]
    #[case::not_a_year("/data/acme/devA/notayear/01/01/00/00")]
    #[case::before_epoch("/data/acme/devA/1969/12/31/00/00")]
    #[case::month_zero("/data/acme/devA/2023/00/01/00/00")]
    #[case::month_13("/data/acme/devA/2023/13/01/00/00")]
    #[case::day_zero("/data/acme/devA/2023/01/00/00/00")]
    #[case::day_32("/data/acme/devA/2023/01/32/00/00")]
    #[case::hour_24("/data/acme/devA/2023/01/01/24/00")]
    #[case::minute_60("/data/acme/devA/2023/01/01/00/60")]
    #[case::signed("/data/acme/devA/2023/+1/01/00/00")]
    #[case::too_short("/acme/2023/01/01/00/00")]
    #[case::parent_dir("/data/acme/../2023/01/01/00/00")]
    fn rejects_malformed_paths(#[case] path: &str) {
        let err = codec().decode(Path::new(path)).unwrap_err();
        let DecodeError::MalformedPath { path: reported, .. } = err;
        assert_eq!(reported, PathBuf::from(path));
    }

    #[test]
    fn decode_is_pure() {
        let path = Path::new("/data/acme/devA/2023/01/01/00/00");
        assert_eq!(codec().decode(path), codec().decode(path));

        let bad = Path::new("/data/acme/devA/2023/01/01/00/99");
        assert_eq!(codec().decode(bad), codec().decode(bad));
    }

    #[test]
    fn depth_counts_tenant_device_and_time() {
        assert_eq!(PathSchema::with_device().depth(), 7);
        assert_eq!(PathSchema::without_device().depth(), 6);
    }
}
