//! Launch transaction builders
//!
//! The builders wrap the external construction services into normalized
//! results:
//! - **pool**: pool creation, plus the optional token-account pre-step
//! - **liquidity**: the liquidity seed (carries the relay tip in relay mode)
//! - **snipe**: one buy per sniper wallet, signed by that wallet's key
//! - **bundle**: ordering pool → liquidity → buys and the relay wire format
//! - **curve**: constant-product quote and minimum-output math
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use launch_bundler::tx_builder::{assemble, TipSpec, TransactionBuilderError};
//! # use launch_bundler::tx_builder::BuiltTransaction;
//!
//! # fn example(
//! #     pool: BuiltTransaction,
//! #     liquidity: BuiltTransaction,
//! #     snipes: Vec<BuiltTransaction>,
//! #     tip: TipSpec,
//! # ) -> Result<(), TransactionBuilderError> {
//! let bundle = assemble(pool, liquidity, snipes, tip)?;
//! let wire = bundle.encode_wire()?;
//! assert_eq!(wire.len(), bundle.len());
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub use errors::TransactionBuilderError;

pub mod bundle;
pub mod context;
pub mod curve;
pub mod instructions;
pub mod liquidity;
pub mod output;
pub mod pool;
pub mod services;
pub mod snipe;

pub use bundle::{assemble, decode_wire, Bundle, BundleEntry, TipSpec};
pub use context::{FeeRates, PoolContext, PoolKeys, ReserveSnapshot};
pub use curve::SwapQuote;
pub use liquidity::LiquiditySeedBuilder;
pub use output::BuiltTransaction;
pub use pool::{PoolBuildOutput, PoolCreationBuilder, PoolSeed, PrestepOutcome};
pub use services::{
    AddLiquidityParams, CreatePoolParams, CreatedPool, FixedSide, PoolService, SwapRequest,
    SwapService,
};
pub use snipe::{SnipeBuilder, SnipeParams};
