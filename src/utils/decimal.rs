//! Balance summaries over decoded wallets.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::exchange::Wallet;

/// Wallets holding a non-zero balance, in server order.
pub fn non_zero(wallets: &[Wallet]) -> Vec<&Wallet> {
    wallets.iter().filter(|w| !w.is_empty()).collect()
}

/// Sum of fiat balances per fiat currency symbol.
pub fn fiat_totals<'a>(
    wallets: impl IntoIterator<Item = &'a Wallet>,
) -> BTreeMap<String, Decimal> {
    wallets.into_iter().fold(BTreeMap::new(), |mut totals, wallet| {
        *totals
            .entry(wallet.fiat_currency_symbol.clone())
            .or_insert(Decimal::ZERO) += wallet.fiat_balance;
        totals
    })
}
