//! `HSCAN` / `ZSCAN` handlers.
//!
//! Cursors are decimal offsets into the collection in member order. A page
//! covers `COUNT` positions starting at the cursor and `MATCH` filters that
//! window, so a page may come back empty while the walk is still running.
//! Entries added or removed between calls can shift positions, which makes a
//! walk over a changing collection repeat or skip elements.

use bytes::Bytes;
use globset::{GlobBuilder, GlobMatcher};

use super::store::{Args, InMemoryStore, Outcome, StoreFault};
use crate::protocol::{format_score, Reply};

const DEFAULT_COUNT: usize = 10;

struct ScanWindow {
    offset: usize,
    count: usize,
    matcher: Option<GlobMatcher>,
}

impl ScanWindow {
    fn parse(args: &mut Args<'_>) -> Result<Self, StoreFault> {
        let offset = std::str::from_utf8(args.next()?)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or(StoreFault::InvalidCursor)?;
        let mut window = Self {
            offset,
            count: DEFAULT_COUNT,
            matcher: None,
        };
        while !args.is_empty() {
            let word = args.next_text()?.to_ascii_uppercase();
            match word.as_str() {
                "MATCH" => {
                    let pattern = String::from_utf8_lossy(args.next()?);
                    let glob = GlobBuilder::new(&pattern)
                        .backslash_escape(true)
                        .build()
                        .map_err(|e| StoreFault::Pattern(e.kind().to_string()))?;
                    window.matcher = Some(glob.compile_matcher());
                }
                "COUNT" => {
                    let count = args.next_int()?;
                    if count < 1 {
                        return Err(StoreFault::Syntax);
                    }
                    window.count = count as usize;
                }
                _ => return Err(StoreFault::Syntax),
            }
        }
        Ok(window)
    }

    fn admits(
        &self,
        name: &[u8],
    ) -> bool {
        match &self.matcher {
            Some(m) => m.is_match(String::from_utf8_lossy(name).as_ref()),
            None => true,
        }
    }

    /// Next cursor after this window over `len` entries, `0` at the end.
    fn next_cursor(
        &self,
        len: usize,
    ) -> usize {
        let end = self.offset.saturating_add(self.count);
        if end >= len {
            0
        } else {
            end
        }
    }

    fn reply(
        cursor: usize,
        tokens: Vec<Reply>,
    ) -> Reply {
        Reply::Array(vec![
            Reply::Bulk(Some(Bytes::from(cursor.to_string()))),
            Reply::Array(tokens),
        ])
    }
}

pub(crate) fn hscan(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    let window = ScanWindow::parse(args)?;
    let page = store.read_hash(key, |h| {
        let tokens = h
            .iter()
            .skip(window.offset)
            .take(window.count)
            .filter(|(field, _)| window.admits(field))
            .flat_map(|(f, v)| [Reply::Bulk(Some(f.clone())), Reply::Bulk(Some(v.clone()))])
            .collect();
        ScanWindow::reply(window.next_cursor(h.len()), tokens)
    })?;
    Ok(page.unwrap_or_else(|| ScanWindow::reply(0, Vec::new())))
}

pub(crate) fn zscan(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    let window = ScanWindow::parse(args)?;
    let page = store.read_zset(key, |z| {
        let tokens = z
            .members()
            .iter()
            .skip(window.offset)
            .take(window.count)
            .filter(|(member, _)| window.admits(member))
            .flat_map(|(m, s)| {
                [
                    Reply::Bulk(Some(m.clone())),
                    Reply::Bulk(Some(Bytes::from(format_score(*s)))),
                ]
            })
            .collect();
        ScanWindow::reply(window.next_cursor(z.len()), tokens)
    })?;
    Ok(page.unwrap_or_else(|| ScanWindow::reply(0, Vec::new())))
}
