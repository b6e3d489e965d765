//! Extended M3U (`#EXTM3U` / `#EXTINF`) parsing, writing and filtering.

use xf_protocol::{Attrs, Channel};

/// Lines between two parse progress callbacks.
const PROGRESS_EVERY: usize = 50;

/// Parse a playlist. See [`parse_with_progress`].
pub fn parse(text: &str) -> Vec<Channel> {
    parse_with_progress(text, |_, _| {})
}

/// Parse a playlist into channels.
///
/// Each `#EXTINF` line (any case) opens a channel whose URL is the next
/// non-empty line not starting with `#`; scanning resumes after that URL.
/// Everything else is ignored. `progress(lines_done, lines_total)` is called
/// every 50 lines and once at the end.
pub fn parse_with_progress(text: &str, mut progress: impl FnMut(usize, usize)) -> Vec<Channel> {
    let lines: Vec<&str> = text.lines().flat_map(|line| line.split('\r')).collect();
    let total = lines.len();
    let mut channels = Vec::new();
    let mut processed = 0;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();
        processed += 1;
        if processed % PROGRESS_EVERY == 0 {
            progress(processed, total);
        }

        if !starts_with_ignore_case(line, "#EXTINF") {
            i += 1;
            continue;
        }

        let (header, title) = split_header(line);

        let mut j = i + 1;
        let mut url = "";
        while j < lines.len() {
            let candidate = lines[j].trim();
            if candidate.is_empty() || candidate.starts_with('#') {
                j += 1;
                continue;
            }
            url = candidate;
            break;
        }

        channels.push(Channel {
            title: title.trim().to_string(),
            duration: parse_duration(header).to_string(),
            attrs: parse_attrs(header),
            url: url.to_string(),
            raw_extinf: line.to_string(),
        });
        i = j + 1;
    }

    progress(total, total);
    channels
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Split `#EXTINF:... attrs,title` at the first comma preceded by balanced
/// double quotes. With stray quotes no comma qualifies and the first comma
/// is used.
fn split_header(line: &str) -> (&str, &str) {
    let mut quotes = 0usize;
    let mut first_comma = None;
    for (idx, c) in line.char_indices() {
        match c {
            '"' => quotes += 1,
            ',' if quotes % 2 == 0 => return (&line[..idx], &line[idx + 1..]),
            ',' if first_comma.is_none() => first_comma = Some(idx),
            _ => {}
        }
    }
    match first_comma {
        Some(idx) => (&line[..idx], &line[idx + 1..]),
        None => (line, ""),
    }
}

/// The `-?[0-9]` run right after `#EXTINF:`, or empty.
fn parse_duration(header: &str) -> &str {
    if !starts_with_ignore_case(header, "#EXTINF:") {
        return "";
    }
    let rest = &header["#EXTINF:".len()..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '-'))
        .unwrap_or(rest.len());
    &rest[..end]
}

fn is_key_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

/// Every `key="value"` in the header, in order of appearance.
fn parse_attrs(header: &str) -> Attrs {
    let bytes = header.as_bytes();
    let mut attrs = Attrs::new();
    let mut i = 0;

    while i < bytes.len() {
        if !is_key_byte(bytes[i]) {
            i += 1;
            continue;
        }
        let key_end = i + bytes[i..]
            .iter()
            .position(|&b| !is_key_byte(b))
            .unwrap_or(bytes.len() - i);

        if bytes[key_end..].starts_with(b"=\"") {
            let value_start = key_end + 2;
            if let Some(len) = bytes[value_start..].iter().position(|&b| b == b'"') {
                attrs.insert(&header[i..key_end], &header[value_start..value_start + len]);
                i = value_start + len + 1;
                continue;
            }
        }
        i = key_end;
    }
    attrs
}

/// Rebuild an `#EXTINF` line. Double quotes inside values become single quotes.
pub fn extinf_line(channel: &Channel) -> String {
    let duration = if channel.duration.is_empty() {
        "-1"
    } else {
        &channel.duration
    };
    let attrs: Vec<String> = channel
        .attrs
        .iter()
        .map(|(k, v)| format!("{k}=\"{}\"", v.replace('"', "'")))
        .collect();

    if attrs.is_empty() {
        format!("#EXTINF:{duration},{}", channel.title)
    } else {
        format!("#EXTINF:{duration} {},{}", attrs.join(" "), channel.title)
    }
}

/// Render a complete playlist.
pub fn write(channels: &[Channel]) -> String {
    let mut out = String::from("#EXTM3U\n");
    for channel in channels {
        out.push_str(&extinf_line(channel));
        out.push('\n');
        out.push_str(&channel.url);
        out.push('\n');
    }
    out
}

/// Field a filter matches against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterField {
    Title,
    /// The `group-title` attribute.
    Group,
    /// Any other attribute, by name.
    Attr(String),
}

impl FilterField {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "" | "title" => FilterField::Title,
            "group" => FilterField::Group,
            other => FilterField::Attr(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FilterField::Title => "title",
            FilterField::Group => "group",
            FilterField::Attr(name) => name,
        }
    }

    fn value<'a>(&self, channel: &'a Channel) -> &'a str {
        match self {
            FilterField::Title => &channel.title,
            FilterField::Group => channel.group(),
            FilterField::Attr(name) => channel.attr(name),
        }
    }
}

/// Channels whose `field` contains `keyword`, case-insensitively.
/// A blank keyword keeps everything.
pub fn filter(channels: &[Channel], field: &FilterField, keyword: &str) -> Vec<Channel> {
    let keyword = keyword.trim().to_lowercase();
    if keyword.is_empty() {
        return channels.to_vec();
    }
    channels
        .iter()
        .filter(|ch| field.value(ch).to_lowercase().contains(&keyword))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "#EXTM3U url-tvg=\"http://epg\"\n\
#EXTINF:-1 tvg-id=\"bbc1.uk\" tvg-name=\"BBC One\" tvg-logo=\"http://l/1.png\" group-title=\"UK | News\",BBC One HD\n\
http://h/live/u/p/1.ts\n\
\n\
#EXTINF:0 tvg-id=\"\" group-title=\"Sports, Live\",Match: A vs B\n\
#EXTVLCOPT:http-user-agent=VLC\n\
http://h/live/u/p/2.ts\n\
#extinf:-1,Lowercase\n\
http://h/3.ts\n";

    #[test]
    fn parses_channels_with_attrs() {
        let channels = parse(SAMPLE);
        assert_eq!(channels.len(), 3);

        let bbc = &channels[0];
        assert_eq!(bbc.title, "BBC One HD");
        assert_eq!(bbc.duration, "-1");
        assert_eq!(bbc.url, "http://h/live/u/p/1.ts");
        assert_eq!(bbc.attr("tvg-id"), "bbc1.uk");
        assert_eq!(bbc.group(), "UK | News");
        let keys: Vec<_> = bbc.attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["tvg-id", "tvg-name", "tvg-logo", "group-title"]);
        assert!(bbc.raw_extinf.starts_with("#EXTINF:-1 tvg-id="));
    }

    #[test]
    fn url_skips_comment_lines_and_comma_in_quotes_stays_in_header() {
        let channels = parse(SAMPLE);
        let sport = &channels[1];
        assert_eq!(sport.title, "Match: A vs B");
        assert_eq!(sport.group(), "Sports, Live");
        assert_eq!(sport.attr("tvg-id"), "");
        assert_eq!(sport.duration, "0");
        assert_eq!(sport.url, "http://h/live/u/p/2.ts");
    }

    #[test]
    fn extinf_tag_is_case_insensitive() {
        let channels = parse(SAMPLE);
        assert_eq!(channels[2].title, "Lowercase");
        assert_eq!(channels[2].duration, "-1");
        assert!(channels[2].attrs.is_empty());
    }

    #[test]
    fn missing_url_at_end() {
        let channels = parse("#EXTM3U\n#EXTINF:-1,Dangling\n# comment\n");
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].url, "");
    }

    #[test]
    fn no_comma_means_empty_title() {
        let channels = parse("#EXTINF:-1 tvg-id=\"x\"\nhttp://u\n");
        assert_eq!(channels[0].title, "");
        assert_eq!(channels[0].attr("tvg-id"), "x");
    }

    #[test]
    fn stray_quote_falls_back_to_first_comma() {
        let channels =
            parse("#EXTINF:-1 tvg-name=\"Joe\"s TV\" group-title=\"A\",Joe's TV\nhttp://u/joe\n");
        assert_eq!(channels[0].title, "Joe's TV");
        assert_eq!(channels[0].group(), "A");
        assert_eq!(channels[0].url, "http://u/joe");
    }

    #[test]
    fn bare_carriage_returns_split_lines() {
        let channels = parse("#EXTM3U\r#EXTINF:-1,One\rhttp://u/1\r#EXTINF:-1,Two\rhttp://u/2\r");
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[1].title, "Two");
        assert_eq!(channels[1].url, "http://u/2");
    }

    #[test]
    fn crlf_lines() {
        let channels = parse("#EXTM3U\r\n#EXTINF:-1,One\r\nhttp://u/1\r\n");
        assert_eq!(channels[0].title, "One");
        assert_eq!(channels[0].url, "http://u/1");
    }

    #[test]
    fn progress_reports_every_fifty_lines_and_end() {
        let mut text = String::from("#EXTM3U\n");
        for i in 0..60 {
            text.push_str(&format!("#EXTINF:-1,C{i}\nhttp://u/{i}\n"));
        }
        let mut calls = Vec::new();
        let channels = parse_with_progress(&text, |done, total| calls.push((done, total)));
        assert_eq!(channels.len(), 60);
        assert_eq!(calls.last(), Some(&(121, 121)));
        assert!(calls.len() >= 2);
    }

    #[test]
    fn extinf_line_rebuilds_attrs_and_escapes_quotes() {
        let mut ch = Channel {
            title: "Say \"Hi\"".into(),
            duration: "-1".into(),
            ..Default::default()
        };
        ch.attrs.insert("tvg-name", "A \"quoted\" name");
        ch.attrs.insert("group-title", "G");
        assert_eq!(
            extinf_line(&ch),
            "#EXTINF:-1 tvg-name=\"A 'quoted' name\" group-title=\"G\",Say \"Hi\""
        );
    }

    #[test]
    fn extinf_line_without_attrs() {
        let ch = Channel {
            title: "Plain".into(),
            ..Default::default()
        };
        assert_eq!(extinf_line(&ch), "#EXTINF:-1,Plain");
    }

    #[test]
    fn write_then_parse_keeps_fields() {
        let original = parse(SAMPLE);
        let reparsed = parse(&write(&original));
        assert_eq!(reparsed.len(), original.len());
        for (a, b) in original.iter().zip(&reparsed) {
            assert_eq!(a.title, b.title);
            assert_eq!(a.url, b.url);
            assert_eq!(a.attrs, b.attrs);
        }
    }

    #[test]
    fn write_starts_with_header() {
        assert_eq!(write(&[]), "#EXTM3U\n");
    }

    #[test]
    fn filter_by_title_group_and_attr() {
        let channels = parse(SAMPLE);

        let by_title = filter(&channels, &FilterField::Title, "  bbc ");
        assert_eq!(by_title.len(), 1);

        let by_group = filter(&channels, &FilterField::parse("group"), "SPORTS");
        assert_eq!(by_group.len(), 1);
        assert_eq!(by_group[0].title, "Match: A vs B");

        let by_attr = filter(&channels, &FilterField::parse("tvg-id"), "uk");
        assert_eq!(by_attr.len(), 1);

        assert_eq!(filter(&channels, &FilterField::Title, "").len(), 3);
        assert!(filter(&channels, &FilterField::Title, "nothing").is_empty());
    }

    #[test]
    fn filter_field_names() {
        assert_eq!(FilterField::parse(""), FilterField::Title);
        assert_eq!(FilterField::parse("group").name(), "group");
        assert_eq!(FilterField::parse("tvg-name").name(), "tvg-name");
    }
}
