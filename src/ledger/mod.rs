/*!
 * Idempotency ledger.
 *
 * Two on-disk mechanisms decide whether work is needed and who may do it:
 * - `fingerprint`: content-hash output naming. An input whose output name
 *   already exists has been translated for that language pair.
 * - `lock`: a process-exclusion lock file per working scope, created
 *   atomically and released by a guard.
 */

pub mod fingerprint;
pub mod lock;

pub use self::fingerprint::{Fingerprint, OutputNameMatcher, output_file_name, output_path};
pub use self::lock::{LockGuard, LockRecord, RunLock};
