use std::collections::HashMap;

/// key for the route an inbound request falls back on when its host
/// matches nothing else
pub(crate) const DEFAULT_ROUTE: &str = "";

/// routing table handed to the tunnel engine: host => upstream url.
/// every stored url carries an http:// or https:// scheme.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct RouteTable(HashMap<String, String>);

impl RouteTable {
    /// Builds a table from the raw `--upstream` spec. Never fails: malformed
    /// entries surface later, at connection time, not here.
    ///
    /// The spec is a comma-separated list of `host=url` pairs. An entry
    /// without `=` becomes the default route. Only the first `=` splits an
    /// entry, so urls with `=` in their query string stay intact. Duplicate
    /// keys: last one wins.
    pub fn parse(spec: &str) -> RouteTable {
        let mut table = HashMap::new();
        for entry in spec.split(',') {
            match entry.split_once('=') {
                Some((key, url)) => {
                    table.insert(key.trim().to_string(), url.trim().to_string());
                }
                None => {
                    let url = entry.trim();
                    if url.is_empty() {
                        continue;
                    }
                    table.insert(DEFAULT_ROUTE.to_string(), url.to_string());
                }
            }
        }
        for url in table.values_mut() {
            if !has_scheme(url) {
                *url = format!("http://{url}");
            }
        }
        RouteTable(table)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Picks the upstream for an inbound host: exact match first, then the
    /// host with its port stripped, then the default route.
    pub fn route_for(&self, host: &str) -> Option<&str> {
        self.0
            .get(host)
            .or_else(|| {
                host.rsplit_once(':')
                    .and_then(|(bare_host, _)| self.0.get(bare_host))
            })
            .or_else(|| self.0.get(DEFAULT_ROUTE))
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

fn has_scheme(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_without_separator_becomes_the_default_route() {
        let table = RouteTable::parse("127.0.0.1:3000");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(DEFAULT_ROUTE), Some("http://127.0.0.1:3000"));
    }

    #[test]
    fn keyed_entries_each_get_a_scheme() {
        let table = RouteTable::parse("a=1,b=2");
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("a"), Some("http://1"));
        assert_eq!(table.get("b"), Some("http://2"));
    }

    #[test]
    fn duplicate_keys_last_one_wins() {
        let table = RouteTable::parse("a=http://x,a=http://y");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("a"), Some("http://y"));
    }

    #[test]
    fn surrounding_whitespace_is_trimmed_and_schemes_are_kept() {
        let table = RouteTable::parse("k= https://already-schemed ");
        assert_eq!(table.get("k"), Some("https://already-schemed"));
    }

    #[test]
    fn only_the_first_separator_splits_an_entry() {
        let table = RouteTable::parse("a=http://x/?page=1");
        assert_eq!(table.get("a"), Some("http://x/?page=1"));
    }

    #[test]
    fn empty_and_blank_specs_yield_an_empty_table() {
        assert_eq!(RouteTable::parse("").len(), 0);
        assert_eq!(RouteTable::parse("   ").len(), 0);
        assert_eq!(RouteTable::parse("a=1,,b=2").len(), 2);
    }

    #[test]
    fn mixed_default_and_keyed_entries() {
        let table = RouteTable::parse("http://127.0.0.1:3000,app.example.com=127.0.0.1:3001");
        assert_eq!(table.get(DEFAULT_ROUTE), Some("http://127.0.0.1:3000"));
        assert_eq!(table.get("app.example.com"), Some("http://127.0.0.1:3001"));
    }

    #[test]
    fn lookup_prefers_exact_host_then_portless_then_default() {
        let table = RouteTable::parse(
            "http://127.0.0.1:3000,app.example.com=http://127.0.0.1:3001",
        );
        assert_eq!(table.route_for("app.example.com"), Some("http://127.0.0.1:3001"));
        assert_eq!(
            table.route_for("app.example.com:8080"),
            Some("http://127.0.0.1:3001")
        );
        assert_eq!(table.route_for("unknown.example.com"), Some("http://127.0.0.1:3000"));
    }

    #[test]
    fn lookup_without_default_route_can_miss() {
        let table = RouteTable::parse("app.example.com=http://127.0.0.1:3001");
        assert_eq!(table.route_for("unknown.example.com"), None);
    }
}
