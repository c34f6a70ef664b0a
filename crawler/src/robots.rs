use parking_lot::{Mutex, RwLock};
use reqwest::{header, Client, Url};
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct Robots {
    allows: Vec<String>,
    disallows: Vec<String>,
    pub crawl_delay: Option<Duration>,
}

/// Minimal parser for the `*` group.
pub fn parse_robots(txt: &str) -> Robots {
    let mut active = false;
    let mut robots = Robots::default();
    for line in txt.lines() {
        let l = line.split('#').next().unwrap_or("").trim();
        if l.is_empty() { continue; }
        if let Some((k, v)) = l.split_once(':') {
            let key = k.trim().to_lowercase();
            let val = v.trim();
            match key.as_str() {
                "user-agent" => { active = val == "*"; }
                "allow" if active && !val.is_empty() => robots.allows.push(val.to_string()),
                "disallow" if active && !val.is_empty() => robots.disallows.push(val.to_string()),
                "crawl-delay" if active => {
                    if let Ok(secs) = val.parse::<f64>() {
                        if secs.is_finite() && secs >= 0.0 { robots.crawl_delay = Some(Duration::from_secs_f64(secs)); }
                    }
                }
                _ => {}
            }
        }
    }
    robots
}

/// Longest matching rule wins; Allow wins a tie.
pub fn path_allowed(path: &str, rules: &Robots) -> bool {
    let longest = |rules: &[String]| rules.iter().filter(|r| path.starts_with(r.as_str())).map(String::len).max();
    match (longest(&rules.allows), longest(&rules.disallows)) {
        (Some(a), Some(d)) => a >= d,
        (_, None) => true,
        (None, Some(_)) => false,
    }
}

/// Per-host robots rules, fetched once.
#[derive(Default)]
pub struct RobotsCache {
    hosts: RwLock<HashMap<String, Robots>>,
}

impl RobotsCache {
    /// Unreachable or missing robots.txt means everything is allowed.
    pub async fn rules(&self, client: &Client, url: &Url) -> Option<Robots> {
        let host = url.host_str()?.to_string();
        let cached = { let c = self.hosts.read(); c.get(&host).cloned() };
        if let Some(r) = cached {
            return Some(r);
        }
        let robots_url = url.join("/robots.txt").ok()?;
        let txt = match client.get(robots_url).header(header::ACCEPT, "text/plain").send().await {
            Ok(resp) if resp.status().is_success() => resp.text().await.unwrap_or_default(),
            _ => String::new(),
        };
        let parsed = parse_robots(&txt);
        { self.hosts.write().insert(host, parsed.clone()); }
        Some(parsed)
    }
}

/// Spaces requests to the same host at least `delay` apart.
pub struct Politeness {
    delay: Duration,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl Politeness {
    pub fn new(delay: Duration) -> Self {
        Self { delay, next_slot: Mutex::new(HashMap::new()) }
    }

    /// Reserve the next request slot for `host` and return how long to wait for it.
    pub fn reserve(&self, host: &str, crawl_delay: Option<Duration>) -> Duration {
        let gap = crawl_delay.map_or(self.delay, |d| d.max(self.delay));
        let now = Instant::now();
        let mut slots = self.next_slot.lock();
        let slot = slots.get(host).copied().filter(|t| *t > now).unwrap_or(now);
        slots.insert(host.to_string(), slot + gap);
        slot - now
    }
}
