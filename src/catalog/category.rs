//! Keyword categorisation.
//!
//! Every keyword found in the (lower-cased) product name contributes all of
//! its categories; matches are unioned, there is no first-match-wins. Brand
//! defaults are unioned in as well, and a product nothing matched lands in
//! [`DEFAULT_CATEGORY`].

use std::collections::BTreeSet;

use crate::domain::aggregates::DEFAULT_CATEGORY;

pub const CHRISTMAS: &str = "Christmas";
pub const CANDLES: &str = "Candles & Fragrance";
pub const LIGHTING: &str = "Lighting";
pub const TABLEWARE: &str = "Tableware";
pub const HOME_DECOR: &str = "Home Décor";
pub const GIFTS: &str = "Gifts";

pub const KEYWORDS: &[(&str, &[&str])] = &[
    // seasonal
    ("christmas", &[CHRISTMAS]),
    ("xmas", &[CHRISTMAS]),
    ("advent", &[CHRISTMAS]),
    ("santa", &[CHRISTMAS]),
    ("snowman", &[CHRISTMAS]),
    ("angel", &[CHRISTMAS, HOME_DECOR]),
    ("star", &[CHRISTMAS, HOME_DECOR]),
    ("bauble", &[CHRISTMAS]),
    ("reindeer", &[CHRISTMAS]),
    ("deer", &[CHRISTMAS, HOME_DECOR]),
    ("elk", &[CHRISTMAS]),
    ("sleigh", &[CHRISTMAS]),
    ("snow", &[CHRISTMAS]),
    ("frost", &[CHRISTMAS]),
    ("winter", &[CHRISTMAS]),
    ("gingerbread", &[CHRISTMAS]),
    ("nutcracker", &[CHRISTMAS]),
    ("holly", &[CHRISTMAS]),
    ("mistletoe", &[CHRISTMAS]),
    ("fir tree", &[CHRISTMAS]),
    ("fir light", &[CHRISTMAS, LIGHTING]),
    ("festive", &[CHRISTMAS]),
    ("holiday", &[CHRISTMAS]),
    ("noel", &[CHRISTMAS]),
    ("wreath", &[CHRISTMAS, HOME_DECOR]),
    ("garland", &[CHRISTMAS]),
    ("king's light", &[CHRISTMAS, LIGHTING]),
    ("nativity", &[CHRISTMAS]),
    // candles & fragrance
    ("candle", &[CANDLES]),
    ("duftkerze", &[CANDLES]),
    ("kerze", &[CANDLES]),
    ("tealight", &[CANDLES]),
    ("tea light", &[CANDLES]),
    ("wax", &[CANDLES]),
    ("scented", &[CANDLES]),
    ("fragrance", &[CANDLES]),
    ("aroma", &[CANDLES]),
    ("diffuser", &[CANDLES, GIFTS]),
    ("reed diffuser", &[CANDLES, GIFTS]),
    ("room spray", &[CANDLES, GIFTS]),
    ("matches", &[CANDLES, GIFTS]),
    ("dinner candle", &[CANDLES]),
    ("candlestick", &[CANDLES, HOME_DECOR]),
    ("candle holder", &[CANDLES, HOME_DECOR]),
    // lighting
    ("light house", &[LIGHTING]),
    ("lighthouse", &[LIGHTING]),
    ("lichthaus", &[LIGHTING]),
    ("lamp", &[LIGHTING]),
    ("lantern", &[LIGHTING]),
    ("laterne", &[LIGHTING]),
    ("led light", &[LIGHTING]),
    ("led mini", &[LIGHTING]),
    ("nightlight", &[LIGHTING]),
    ("uri", &[LIGHTING]),
    ("glossy light", &[LIGHTING]),
    ("light object", &[LIGHTING]),
    ("light landscape", &[LIGHTING]),
    // tableware
    ("mug", &[TABLEWARE, GIFTS]),
    ("cup", &[TABLEWARE]),
    ("becher", &[TABLEWARE]),
    ("bowl", &[TABLEWARE, HOME_DECOR]),
    ("plate", &[TABLEWARE]),
    ("dish", &[TABLEWARE]),
    ("tray", &[TABLEWARE, HOME_DECOR]),
    ("etagere", &[TABLEWARE, HOME_DECOR]),
    ("napkin", &[TABLEWARE]),
    ("serviette", &[TABLEWARE]),
    ("coaster", &[TABLEWARE]),
    ("glass", &[TABLEWARE]),
    ("carafe", &[TABLEWARE]),
    ("jug", &[TABLEWARE]),
    ("espresso", &[TABLEWARE, GIFTS]),
    ("egg cup", &[TABLEWARE]),
    ("cutting board", &[TABLEWARE]),
    ("cruet", &[TABLEWARE]),
    ("wine cooler", &[TABLEWARE]),
    ("bottle opener", &[TABLEWARE, GIFTS]),
    ("spoon", &[TABLEWARE]),
    ("jar", &[TABLEWARE, HOME_DECOR]),
    // home décor, textiles, storage
    ("throw", &[HOME_DECOR]),
    ("scarf", &[HOME_DECOR, GIFTS]),
    ("shawl", &[HOME_DECOR, GIFTS]),
    ("alpaca", &[HOME_DECOR]),
    ("duvet", &[HOME_DECOR]),
    ("bedcover", &[HOME_DECOR]),
    ("bed linen", &[HOME_DECOR]),
    ("vase", &[HOME_DECOR]),
    ("figure", &[HOME_DECOR]),
    ("figurine", &[HOME_DECOR]),
    ("sculpture", &[HOME_DECOR]),
    ("ornament", &[HOME_DECOR]),
    ("decoration", &[HOME_DECOR]),
    ("cushion", &[HOME_DECOR]),
    ("pillow", &[HOME_DECOR]),
    ("blanket", &[HOME_DECOR]),
    ("rug", &[HOME_DECOR]),
    ("towel", &[HOME_DECOR]),
    ("basket", &[HOME_DECOR]),
    ("storage", &[HOME_DECOR]),
    ("box", &[HOME_DECOR, GIFTS]),
    ("tin", &[HOME_DECOR, GIFTS]),
    ("mirror", &[HOME_DECOR]),
    ("frame", &[HOME_DECOR, GIFTS]),
    ("hook", &[HOME_DECOR]),
    ("hanger", &[HOME_DECOR]),
    ("pot", &[HOME_DECOR]),
    ("planter", &[HOME_DECOR]),
    ("bird", &[HOME_DECOR]),
    ("flower carrier", &[HOME_DECOR]),
    ("ball", &[HOME_DECOR]),
    // gifts
    ("gift", &[GIFTS]),
    ("present", &[GIFTS]),
    ("giftbox", &[GIFTS]),
    ("gift set", &[GIFTS]),
    ("zwitscherbox", &[GIFTS, HOME_DECOR]),
    ("birdybox", &[GIFTS, HOME_DECOR]),
    ("lakeside", &[GIFTS, HOME_DECOR]),
    ("soundbox", &[GIFTS, HOME_DECOR]),
    ("relaxound", &[GIFTS, HOME_DECOR]),
    ("bath bomb", &[GIFTS]),
    ("bath salt", &[GIFTS]),
    ("soap", &[GIFTS]),
    ("hand cream", &[GIFTS]),
    ("lip balm", &[GIFTS]),
    ("body wash", &[GIFTS]),
    ("massage", &[GIFTS]),
    ("spa", &[GIFTS]),
    ("card", &[GIFTS]),
    ("keychain", &[GIFTS]),
    ("keyring", &[GIFTS]),
    ("key ring", &[GIFTS]),
    ("puzzle", &[GIFTS]),
    ("game", &[GIFTS]),
    ("notebook", &[GIFTS]),
    ("guestbook", &[GIFTS]),
    ("calendar", &[GIFTS]),
    ("money box", &[GIFTS, HOME_DECOR]),
    ("lucky", &[GIFTS]),
    ("guardian angel", &[GIFTS]),
    ("apron", &[GIFTS, HOME_DECOR]),
    ("bag", &[GIFTS]),
    ("fan", &[GIFTS]),
    ("boccia", &[GIFTS]),
    ("kubb", &[GIFTS]),
    ("curling", &[GIFTS]),
];

/// Categories every product of a brand belongs to, whatever its name says.
pub const BRAND_DEFAULTS: &[(&str, &[&str])] = &[
    ("My Flame", &[CANDLES]),
    ("Relaxound", &[HOME_DECOR, GIFTS]),
    ("Elvang", &[HOME_DECOR]),
];

pub fn assign_categories(name: &str, brand: &str) -> BTreeSet<String> {
    let name = name.to_lowercase();
    let mut categories: BTreeSet<String> = BRAND_DEFAULTS
        .iter()
        .filter(|(b, _)| *b == brand)
        .flat_map(|(_, cats)| cats.iter())
        .map(|c| c.to_string())
        .collect();

    for (keyword, cats) in KEYWORDS {
        if name.contains(keyword) {
            categories.extend(cats.iter().map(|c| c.to_string()));
        }
    }

    if categories.is_empty() {
        categories.insert(DEFAULT_CATEGORY.to_string());
    }
    categories
}
