use freshd_core::{FreshdError, FreshdResult};

/// 任务的年龄窗口（毫秒）
///
/// 表示距离上次运行的可接受年龄区间，满足 `min_age_ms <= max_age_ms`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeWindow {
    pub min_age_ms: i64,
    pub max_age_ms: i64,
}

impl AgeWindow {
    /// 解析窗口表达式，支持三种形式（按顺序尝试）：
    ///
    /// 1. `"5min"`：精确目标，min = max
    /// 2. `"1h +/- 10min"`：中心值加减容差
    /// 3. `"30s - 2min"`：显式区间
    pub fn parse(spec: &str) -> FreshdResult<Self> {
        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return Err(FreshdError::invalid_window(spec, "表达式为空"));
        }

        if let Some((base, tolerance)) = trimmed.split_once("+/-") {
            let base = parse_duration_ms(spec, base)?;
            let tolerance = parse_duration_ms(spec, tolerance)?;
            if tolerance > base {
                return Err(FreshdError::invalid_window(spec, "容差不能大于中心值"));
            }
            return Ok(Self {
                min_age_ms: base - tolerance,
                max_age_ms: base + tolerance,
            });
        }

        if let Ok(exact) = humantime::parse_duration(trimmed) {
            let exact = exact.as_millis() as i64;
            return Ok(Self {
                min_age_ms: exact,
                max_age_ms: exact,
            });
        }

        if let Some((min, max)) = trimmed.split_once('-') {
            let min_age_ms = parse_duration_ms(spec, min)?;
            let max_age_ms = parse_duration_ms(spec, max)?;
            if min_age_ms > max_age_ms {
                return Err(FreshdError::invalid_window(spec, "区间下界不能大于上界"));
            }
            return Ok(Self {
                min_age_ms,
                max_age_ms,
            });
        }

        Err(FreshdError::invalid_window(spec, "无法识别的窗口形式"))
    }

    /// 窗口宽度，即抖动取值区间的上限
    pub fn jitter_span_ms(&self) -> i64 {
        self.max_age_ms - self.min_age_ms
    }

    pub fn is_exact(&self) -> bool {
        self.min_age_ms == self.max_age_ms
    }
}

fn parse_duration_ms(spec: &str, part: &str) -> FreshdResult<i64> {
    humantime::parse_duration(part.trim())
        .map(|d| d.as_millis() as i64)
        .map_err(|e| FreshdError::invalid_window(spec, e.to_string()))
}

/// 人类可读的耗时表示，精确到毫秒
pub fn human_duration(ms: i64) -> String {
    humantime::format_duration(std::time::Duration::from_millis(ms.max(0) as u64)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: i64 = 60 * 1000;

    #[test]
    fn test_parse_exact_form() {
        let window = AgeWindow::parse("5min").unwrap();
        assert_eq!(window.min_age_ms, 5 * MINUTE);
        assert_eq!(window.max_age_ms, 5 * MINUTE);
        assert!(window.is_exact());
        assert_eq!(window.jitter_span_ms(), 0);
    }

    #[test]
    fn test_parse_tolerance_form() {
        let window = AgeWindow::parse("1h +/- 10min").unwrap();
        assert_eq!(window.min_age_ms, 50 * MINUTE);
        assert_eq!(window.max_age_ms, 70 * MINUTE);
    }

    #[test]
    fn test_parse_range_form() {
        let window = AgeWindow::parse("30s - 2min").unwrap();
        assert_eq!(window.min_age_ms, 30 * 1000);
        assert_eq!(window.max_age_ms, 2 * MINUTE);

        // 不带空格的写法也接受
        let window = AgeWindow::parse("30s-2min").unwrap();
        assert_eq!(window.min_age_ms, 30 * 1000);
    }

    #[test]
    fn test_tolerance_larger_than_base_rejected() {
        let err = AgeWindow::parse("10min +/- 1h").unwrap_err();
        assert!(err.to_string().contains("10min +/- 1h"));
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert!(AgeWindow::parse("2min - 30s").is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        for spec in ["", "   ", "whenever", "5min +/-", "- 2min"] {
            assert!(AgeWindow::parse(spec).is_err(), "应拒绝: {spec:?}");
        }
    }

    #[test]
    fn test_error_names_offending_spec() {
        let err = AgeWindow::parse("whenever").unwrap_err();
        assert!(err.to_string().contains("whenever"));
    }

    #[test]
    fn test_human_duration() {
        assert_eq!(human_duration(1500), "1s 500ms");
        assert_eq!(human_duration(0), "0s");
        // 负值按0处理
        assert_eq!(human_duration(-5), "0s");
    }
}
