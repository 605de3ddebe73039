//! Path-indexed directory tree used by unpacked archives
//!
//! Entries live in an arena and refer to each other by index: a fixed array
//! of hash buckets with chained collisions, plus child/sibling lists rooted
//! at a single sentinel. Successful lookups promote the hit to the front of
//! its bucket chain, which pays off on real archives where access locality
//! is high.

use crate::archive::Visit;
use crate::error::{ErrorCode, Result};

const HASH_BUCKETS: usize = 64;

struct Node<P> {
    /// Full source-relative path. The root's is `/`.
    path: String,
    is_dir: bool,
    hash_next: Option<usize>,
    first_child: Option<usize>,
    sibling: Option<usize>,
    payload: P,
}

/// Directory tree keyed by path hash.
///
/// `P` is the per-entry payload kept alongside the common header (offsets,
/// sizes, timestamps — whatever the archive format needs).
pub struct DirTree<P> {
    nodes: Vec<Node<P>>,
    buckets: [Option<usize>; HASH_BUCKETS],
    case_sensitive: bool,
    /// Fold only `A..Z`, one byte at a time. A fast path for formats whose
    /// names are known to be US-ASCII.
    ascii_only: bool,
}

impl<P: Default> DirTree<P> {
    pub fn new(case_sensitive: bool, ascii_only: bool) -> Self {
        let root = Node {
            path: "/".to_owned(),
            is_dir: true,
            hash_next: None,
            first_child: None,
            sibling: None,
            payload: P::default(),
        };
        Self {
            nodes: vec![root],
            buckets: [None; HASH_BUCKETS],
            case_sensitive,
            ascii_only,
        }
    }

    fn bucket_of(&self, path: &str) -> usize {
        let h = if self.case_sensitive {
            hash_bytes(path)
        } else if self.ascii_only {
            hash_ascii_folded(path)
        } else {
            hash_case_folded(path)
        };
        (h as usize) % HASH_BUCKETS
    }

    fn names_equal(&self, a: &str, b: &str) -> bool {
        if self.case_sensitive {
            a == b
        } else if self.ascii_only {
            a.len() == b.len() && a.bytes().map(fold_ascii).eq(b.bytes().map(fold_ascii))
        } else {
            a.chars()
                .flat_map(char::to_lowercase)
                .eq(b.chars().flat_map(char::to_lowercase))
        }
    }

    /// Looks up `path`, promoting a hit to the front of its bucket chain.
    /// The empty path names the root.
    pub fn find(&mut self, path: &str) -> Result<usize> {
        if path.is_empty() {
            return Ok(0);
        }
        let bucket = self.bucket_of(path);
        let mut prev: Option<usize> = None;
        let mut cur = self.buckets[bucket];
        while let Some(idx) = cur {
            if self.names_equal(&self.nodes[idx].path, path) {
                if let Some(p) = prev {
                    self.nodes[p].hash_next = self.nodes[idx].hash_next;
                    self.nodes[idx].hash_next = self.buckets[bucket];
                    self.buckets[bucket] = Some(idx);
                }
                return Ok(idx);
            }
            prev = cur;
            cur = self.nodes[idx].hash_next;
        }
        Err(ErrorCode::NotFound)
    }

    /// Finds the parent directory for `path`, creating missing ancestors.
    fn add_ancestors(&mut self, path: &str) -> Result<usize> {
        let Some(sep) = path.rfind('/') else {
            return Ok(0);
        };
        let parent = &path[..sep];
        match self.find(parent) {
            Ok(idx) => {
                if !self.nodes[idx].is_dir {
                    return Err(ErrorCode::Corrupt);
                }
                Ok(idx)
            }
            Err(ErrorCode::NotFound) => self.add(parent, true),
            Err(e) => Err(e),
        }
    }

    /// Adds `path`, returning the existing entry if one is already present.
    pub fn add(&mut self, path: &str, is_dir: bool) -> Result<usize> {
        match self.find(path) {
            Ok(idx) => return Ok(idx),
            Err(ErrorCode::NotFound) => {}
            Err(e) => return Err(e),
        }
        let parent = self.add_ancestors(path)?;
        let bucket = self.bucket_of(path);
        let idx = self.nodes.len();
        let node = Node {
            path: path.to_owned(),
            is_dir,
            hash_next: self.buckets[bucket],
            first_child: None,
            sibling: self.nodes[parent].first_child,
            payload: P::default(),
        };
        self.nodes.push(node);
        self.buckets[bucket] = Some(idx);
        self.nodes[parent].first_child = Some(idx);
        Ok(idx)
    }

    pub fn is_dir(&self, idx: usize) -> bool {
        self.nodes[idx].is_dir
    }

    pub fn path(&self, idx: usize) -> &str {
        &self.nodes[idx].path
    }

    pub fn payload(&self, idx: usize) -> &P {
        &self.nodes[idx].payload
    }

    pub fn payload_mut(&mut self, idx: usize) -> &mut P {
        &mut self.nodes[idx].payload
    }

    /// Number of entries, the root excluded.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visits the immediate children of `path` in list order, passing each
    /// basename to `callback`.
    pub fn enumerate(
        &mut self,
        path: &str,
        callback: &mut dyn FnMut(&str) -> Result<Visit>,
    ) -> Result<Visit> {
        let dir = self.find(path)?;
        let mut cur = self.nodes[dir].first_child;
        while let Some(idx) = cur {
            let node = &self.nodes[idx];
            let name = node.path.rsplit('/').next().unwrap_or(&node.path);
            match callback(name)? {
                Visit::Stop => return Ok(Visit::Stop),
                Visit::Continue => {}
            }
            cur = self.nodes[idx].sibling;
        }
        Ok(Visit::Continue)
    }
}

fn fold_ascii(b: u8) -> u8 {
    if b.is_ascii_uppercase() { b + 32 } else { b }
}

fn djb_step(hash: u32, b: u32) -> u32 {
    (hash << 5).wrapping_add(hash) ^ b
}

fn hash_bytes(s: &str) -> u32 {
    s.bytes().fold(5381, |h, b| djb_step(h, u32::from(b)))
}

fn hash_ascii_folded(s: &str) -> u32 {
    s.bytes()
        .map(fold_ascii)
        .fold(5381, |h, b| djb_step(h, u32::from(b)))
}

fn hash_case_folded(s: &str) -> u32 {
    let mut hash = 5381;
    for ch in s.chars() {
        for folded in ch.to_lowercase() {
            for b in (folded as u32).to_le_bytes() {
                hash = djb_step(hash, u32::from(b));
            }
        }
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn added_paths_are_found_again() {
        let mut tree: DirTree<u32> = DirTree::new(true, false);
        let a = tree.add("music/title.mid", false).unwrap();
        *tree.payload_mut(a) = 7;

        let found = tree.find("music/title.mid").unwrap();
        assert_eq!(found, a);
        assert_eq!(*tree.payload(found), 7);
        assert_eq!(tree.path(found), "music/title.mid");
    }

    #[test]
    fn missing_ancestors_are_created_as_directories() {
        let mut tree: DirTree<()> = DirTree::new(true, false);
        tree.add("a/b/c", false).unwrap();

        let b = tree.find("a/b").unwrap();
        assert!(tree.is_dir(b));
        let a = tree.find("a").unwrap();
        assert!(tree.is_dir(a));
    }

    #[test]
    fn a_file_cannot_gain_children() {
        let mut tree: DirTree<()> = DirTree::new(true, false);
        tree.add("readme", false).unwrap();
        assert_eq!(tree.add("readme/inside", false), Err(ErrorCode::Corrupt));
    }

    #[test]
    fn duplicate_adds_return_the_original_entry() {
        let mut tree: DirTree<()> = DirTree::new(true, false);
        let first = tree.add("x", false).unwrap();
        let second = tree.add("x", false).unwrap();
        assert_eq!(first, second);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn enumerate_lists_immediate_children_by_basename() {
        let mut tree: DirTree<()> = DirTree::new(true, false);
        tree.add("dir/one", false).unwrap();
        tree.add("dir/two", false).unwrap();
        tree.add("dir/sub/deep", false).unwrap();
        tree.add("top", false).unwrap();

        let mut seen = Vec::new();
        tree.enumerate("dir", &mut |name| {
            seen.push(name.to_owned());
            Ok(Visit::Continue)
        })
        .unwrap();

        seen.sort();
        assert_eq!(seen, ["one", "sub", "two"]);
    }

    #[test]
    fn enumerate_stops_when_asked() {
        let mut tree: DirTree<()> = DirTree::new(true, false);
        tree.add("d/a", false).unwrap();
        tree.add("d/b", false).unwrap();

        let mut count = 0;
        let visit = tree
            .enumerate("d", &mut |_| {
                count += 1;
                Ok(Visit::Stop)
            })
            .unwrap();
        assert_eq!(visit, Visit::Stop);
        assert_eq!(count, 1);
    }

    #[test]
    fn case_insensitive_trees_fold_lookups() {
        let mut tree: DirTree<()> = DirTree::new(false, true);
        let idx = tree.add("STALKER.MID", false).unwrap();
        assert_eq!(tree.find("stalker.mid").unwrap(), idx);

        let mut utf8: DirTree<()> = DirTree::new(false, false);
        let idx = utf8.add("Grüße.txt", false).unwrap();
        assert_eq!(utf8.find("grüße.TXT").unwrap(), idx);
    }

    #[test]
    fn case_sensitive_trees_do_not() {
        let mut tree: DirTree<()> = DirTree::new(true, false);
        tree.add("maps/E1M1.bsp", false).unwrap();
        assert_eq!(tree.find("maps/e1m1.bsp"), Err(ErrorCode::NotFound));
    }
}
