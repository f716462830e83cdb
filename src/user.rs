//! # Client Specifications
//!
//! What the user types and what goes over the wire.
//!
//! ## Search Field
//! Every line that is not a command is the new value of the search field.
//! - `app` then `apple` on the next line searches `apple` once, 1 second after the last line
//! - `!apple` searches right away
//! - An empty line clears the field and the result list
//!
//! ## Commands
//! - `:quick [n]` popular searches, `n` submits one
//! - `:detail <n>` nutrition facts for result `n`, recorded in history when signed in
//! - `:log <n> <grams> [meal_type] [date]` logs result `n` scaled from 100g to `grams`
//! - `:meals [days] [type=lunch] [from=..] [to=..] [q=..]` logged meals, filtered locally
//! - `:edit <id> key=value...`, `:delete <id>...`
//! - `:summary [date]` totals against goals
//! - `:trends [7|30]` one row per day, days without meals included as zero
//! - `:export [days]` PDF report written to the export directory
//! - `:history`, `:stats`
//! - `:login <email> <password>`, `:signup <email> <password> [name]`, `:logout`, `:reset <email>`
//! - `:profile`, `:profile set key=value...`, `:goals <type> <current> <target> <activity>`
//! - `:health`, `:help`, `:quit`
//!
//!
//!
//! ## Overall Payloads
//!
//! Responses/requests between the client and backend.
//!
//! ### Envelope
//! - JSON body with `success: bool` and `error` on failure
//! - 429 bodies carry `retry_after` seconds, 60 when missing
//! - Protected routes take `Authorization: Bearer <firebase id token>`
//!
//! ### Search
//! From backend
//! - `foods`: up to 10 entries, each with `fdcId`, `description`, `dataType`, `brandOwner` and a nutrient preview
//! - `totalHits`
//!
//! ### Details
//! From backend
//! - `food.macronutrients`: calories, protein, carbohydrates, fat
//! - `food.micronutrients`, `food.otherNutrients`: keyed by USDA nutrient name
//! - All amounts per 100g
//!
//! ### Meals
//! To backend
//! - `fdc_id`, `food_name`, `serving_size`, `serving_unit`, `calories`, `protein`, `carbs`, `fat`, `meal_type`, `logged_date`
//! - Amounts already scaled to the serving
//!
//! Edits send only the changed fields.
//!
//! ### Profile
//! To backend
//! - Every profile field is sent on update, missing ones as `null`
//! - Goals are recomputed by the backend from goal type, weights and activity level
//!
//!
//!
//! ## Flow
//!
//! - Sign in against Firebase, get ID and refresh tokens
//! - Send the ID token to `/api/auth/verify`, backend creates the user row on first sight
//! - Fetch the profile, cache it until sign out
//! - Refresh the ID token when it is within 5 minutes of expiring
//! - Sign out drops tokens, profile and cached history
