use std::collections::HashMap;
use std::path::Path;

use super::procfs::ProcfsReader;

pub const DEFAULT_PASSWD_PATH: &str = "/etc/passwd";

/// Numeric user id (as text) to user name, built from the passwd table.
///
/// Built once per refresh and shared read-only by every process snapshot of
/// that refresh.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UidUserMap {
    users: HashMap<String, String>,
}

impl UidUserMap {
    /// Reads `name:password:uid:...` records; the last record wins on a
    /// duplicate uid. Records with fewer than three fields are skipped.
    pub fn build(reader: &ProcfsReader, passwd: &Path) -> Self {
        let users = Self::from_records(reader.read_delimited_records(passwd, ':'));
        if users.is_empty() {
            tracing::warn!(path = %passwd.display(), "user database is empty or unreadable");
        }
        users
    }

    pub fn from_records<I, R>(records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[String]>,
    {
        let mut users = HashMap::new();
        for record in records {
            let record = record.as_ref();
            let (Some(name), Some(uid)) = (record.first(), record.get(2)) else {
                continue;
            };
            if name.is_empty() || uid.is_empty() || name.starts_with('#') {
                continue;
            }
            users.insert(uid.trim().to_string(), name.trim().to_string());
        }
        UidUserMap { users }
    }

    pub fn get(&self, uid: &str) -> Option<&str> {
        self.users.get(uid).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for UidUserMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        UidUserMap {
            users: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::fixture::FakeProc;

    #[test]
    fn maps_third_field_to_first() {
        let fake = FakeProc::new("users_passwd");
        let passwd = fake.write(
            "passwd",
            "root:x:0:0:root:/root:/bin/bash\n\
             # comment line\n\
             daemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin\n\
             broken\n\
             alice:x:1000:1000:Alice,,,:/home/alice:/bin/zsh\n",
        );
        let users = UidUserMap::build(&fake.reader(), &passwd);
        assert_eq!(users.len(), 3);
        assert_eq!(users.get("0"), Some("root"));
        assert_eq!(users.get("1000"), Some("alice"));
        assert_eq!(users.get("4242"), None);
    }

    #[test]
    fn last_duplicate_uid_wins() {
        let users = UidUserMap::from_records(vec![
            vec!["first".to_string(), "x".to_string(), "7".to_string()],
            vec!["second".to_string(), "x".to_string(), "7".to_string()],
        ]);
        assert_eq!(users.get("7"), Some("second"));
    }

    #[test]
    fn unreadable_database_is_empty() {
        let fake = FakeProc::new("users_missing");
        let users = UidUserMap::build(&fake.reader(), &fake.root().join("passwd"));
        assert!(users.is_empty());
    }
}
