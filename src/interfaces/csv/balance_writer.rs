use crate::domain::account::AccountBalance;
use crate::error::Result;
use std::io::Write;

/// Writes account balances as `username,balance` CSV.
pub struct BalanceWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> BalanceWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes the header followed by one row per account, then flushes.
    pub fn write_balances(
        &mut self,
        accounts: impl IntoIterator<Item = AccountBalance>,
    ) -> Result<()> {
        self.writer.write_record(["username", "balance"])?;
        for account in accounts {
            self.writer.serialize((account.username, account.balance))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_balances() {
        let mut out = Vec::new();
        BalanceWriter::new(&mut out)
            .write_balances(vec![
                AccountBalance {
                    username: "alice".into(),
                    balance: 30,
                },
                AccountBalance {
                    username: "bob".into(),
                    balance: 0,
                },
            ])
            .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "username,balance\nalice,30\nbob,0\n"
        );
    }
}
