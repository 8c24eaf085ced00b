//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Best-price finder for the per-event book. Orders follow price-time priority: the lowest ask and
// the highest bid win, and at equal prices the earlier created_at wins. All functions here are
// pure reads over rows already fetched from the store.
//
// | Component        | Description                                                  |
// |------------------|--------------------------------------------------------------|
// | lowest_ask       | Best sell order for an event.                                |
// | highest_bid      | Best buy order for an event.                                 |
// | top_ask_prices   | Up to DEPTH_LIMIT lowest ask prices (market-depth display).  |
// | top_bid_prices   | Up to DEPTH_LIMIT highest bid prices.                        |
//--------------------------------------------------------------------------------------------------

use rust_decimal::Decimal;

use crate::types::{Ask, Bid};

/// How many price levels the market-depth display shows per side.
pub const DEPTH_LIMIT: usize = 5;

/// The ask with the minimum price; ties broken by earliest `created_at`.
pub fn lowest_ask(asks: &[Ask]) -> Option<&Ask> {
    asks.iter().fold(None, |best, candidate| match best {
        None => Some(candidate),
        Some(current) => {
            let better = candidate.price < current.price
                || (candidate.price == current.price && candidate.created_at < current.created_at);
            if better { Some(candidate) } else { Some(current) }
        }
    })
}

/// The bid with the maximum price; ties broken by earliest `created_at`.
pub fn highest_bid(bids: &[Bid]) -> Option<&Bid> {
    bids.iter().fold(None, |best, candidate| match best {
        None => Some(candidate),
        Some(current) => {
            let better = candidate.price > current.price
                || (candidate.price == current.price && candidate.created_at < current.created_at);
            if better { Some(candidate) } else { Some(current) }
        }
    })
}

/// Up to `limit` ask prices, cheapest first, time priority at equal prices.
pub fn top_ask_prices(asks: &[Ask], limit: usize) -> Vec<Decimal> {
    let mut sorted: Vec<&Ask> = asks.iter().collect();
    sorted.sort_by(|a, b| a.price.cmp(&b.price).then(a.created_at.cmp(&b.created_at)));
    sorted.into_iter().take(limit).map(|ask| ask.price).collect()
}

/// Up to `limit` bid prices, highest first, time priority at equal prices.
pub fn top_bid_prices(bids: &[Bid], limit: usize) -> Vec<Decimal> {
    let mut sorted: Vec<&Bid> = bids.iter().collect();
    sorted.sort_by(|a, b| b.price.cmp(&a.price).then(a.created_at.cmp(&b.created_at)));
    sorted.into_iter().take(limit).map(|bid| bid.price).collect()
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                          | Description                                              |
// |-------------------------------|----------------------------------------------------------|
// | test_empty_book               | No orders gives no best price.                           |
// | test_lowest_ask_price         | Cheapest ask wins.                                       |
// | test_highest_bid_price        | Richest bid wins.                                        |
// | test_equal_price_time_priority| Earlier created_at wins at equal prices, both sides.     |
// | test_depth_caps_at_limit      | Depth lists stop at the limit and stay sorted.           |
//--------------------------------------------------------------------------------------------------
