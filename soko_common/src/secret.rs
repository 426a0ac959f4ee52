use std::fmt;

/// A credential that must never reach the logs. The Daraja consumer secret and STK passkey are wrapped in this
/// at configuration time; printing a `Secret` in any format yields `****`, and the value only comes back out
/// through an explicit [`Secret::reveal`] call at the point where the API request is signed.
#[derive(Clone, Default)]
pub struct Secret<T>(T);

impl<T> Secret<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn reveal(&self) -> &T {
        &self.0
    }
}

impl<T> From<T> for Secret<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn secrets_never_print() {
        let passkey = Secret::new("bfb279f9aa9bdbcf158e97dd71a467cd2e0c89305".to_string());
        assert_eq!(format!("{passkey}"), "****");
        assert_eq!(format!("{passkey:?}"), "****");
        assert_eq!(format!("{:?}", Some(&passkey)), "Some(****)");
        assert_eq!(passkey.reveal(), "bfb279f9aa9bdbcf158e97dd71a467cd2e0c89305");
    }
}
