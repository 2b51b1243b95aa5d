//! Directory naming for cached repositories

/// Form-urlencode `s` so it can be used as a single directory name.
///
/// `A-Z a-z 0-9 . - * _` pass through, space becomes `+`, every other byte
/// becomes `%XX`.
pub fn url_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' | b'*' | b'_' => out.push(byte as char),
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Short name of a repository URI: last path segment without `.git`
pub fn short_name(uri: &str) -> String {
    let trimmed = uri.trim_end_matches('/');
    let last = trimmed.rsplit(['/', '\\', ':']).next().unwrap_or(trimmed);
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() {
        url_encode(uri)
    } else {
        name.to_string()
    }
}

/// Name identifying one mirror: `<short name>@<branch>@<uri>`.
///
/// Branch and URI are url-encoded, so the last two `@` always split it back
/// apart and two mirrors differing in either part never share a name.
pub fn mirror_key(uri: &str, branch: &str) -> String {
    format!("{}@{}@{}", short_name(uri), url_encode(branch), url_encode(uri))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_encode() {
        assert_eq!(
            url_encode("https://git.openjdk.org/jdk.git"),
            "https%3A%2F%2Fgit.openjdk.org%2Fjdk.git"
        );
        assert_eq!(url_encode("/tmp/a b"), "%2Ftmp%2Fa+b");
        assert_eq!(url_encode("safe-name_1.*"), "safe-name_1.*");
    }

    #[test]
    fn test_url_encode_multibyte() {
        assert_eq!(url_encode("é"), "%C3%A9");
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("https://git.openjdk.org/jdk.git"), "jdk");
        assert_eq!(short_name("https://github.com/openjdk/skara/"), "skara");
        assert_eq!(short_name("git@github.com:openjdk/jfx.git"), "jfx");
        assert_eq!(short_name("/srv/git/hosted.git"), "hosted");
        assert_eq!(short_name("file:///srv/plain"), "plain");
    }

    #[test]
    fn test_mirror_key() {
        assert_eq!(
            mirror_key("https://git.openjdk.org/jdk.git", "master"),
            "jdk@master@https%3A%2F%2Fgit.openjdk.org%2Fjdk.git"
        );
        assert_eq!(mirror_key("/srv/a", "jdk/21"), "a@jdk%2F21@%2Fsrv%2Fa");
    }

    #[test]
    fn test_mirror_key_distinguishes_branches_and_hosts() {
        let jdk = mirror_key("https://a/jdk.git", "master");
        assert_ne!(jdk, mirror_key("https://a/jdk.git", "other"));
        assert_ne!(jdk, mirror_key("https://b/jdk.git", "master"));
        assert_ne!(mirror_key("a@b", "c"), mirror_key("a", "b@c"));
    }

    #[test]
    fn test_short_name_falls_back_to_encoding() {
        assert_eq!(short_name("/"), "%2F");
    }
}
