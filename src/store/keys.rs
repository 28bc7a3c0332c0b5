/// 速率限制记录键前缀
const RATE_LIMIT_NAMESPACE: &str = "rate_limit";

/// 通知记录键前缀
const NOTIFICATIONS_NAMESPACE: &str = "notifications";

const SEPARATOR: char = ':';

/// 转义键段中的分隔符，保证不同令牌的前缀互不重叠
fn escape_segment(segment: &str) -> String {
    let mut escaped = String::with_capacity(segment.len());
    for ch in segment.chars() {
        match ch {
            '%' => escaped.push_str("%25"),
            SEPARATOR => escaped.push_str("%3A"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn compose(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|segment| escape_segment(segment))
        .collect::<Vec<_>>()
        .join(":")
}

/// 生成令牌的速率限制键
pub fn rate_limit_key(token: &str) -> String {
    compose(&[RATE_LIMIT_NAMESPACE, token])
}

/// 生成单条通知键
pub fn notification_key(token: &str, id: &str) -> String {
    compose(&[NOTIFICATIONS_NAMESPACE, token, id])
}

/// 生成令牌全部通知的扫描前缀
pub fn notifications_prefix(token: &str) -> String {
    let mut prefix = compose(&[NOTIFICATIONS_NAMESPACE, token]);
    prefix.push(SEPARATOR);
    prefix
}

/// 转义 Redis SCAN MATCH 的通配字符
pub fn glob_escape(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\' | '^') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
