/// Standard Unix exit codes for the markport CLI.
///
/// These codes follow the BSD convention where possible and provide
/// meaningful feedback about the type of error that occurred.
///
/// Successful termination
pub const SUCCESS: i32 = 0;

/// Command line usage error - invalid arguments, missing owner, unreadable input file
pub const USAGE: i32 = 64;

/// Input data was rejected - empty candidate list, unparseable JSON
pub const DATAERR: i32 = 65;

/// The import job does not exist
pub const NOT_FOUND: i32 = 66;

/// The remote repository could not be reached or refused the request
pub const UNAVAILABLE: i32 = 69;

/// Internal failure; the job state is unchanged and the command can be retried
pub const SOFTWARE: i32 = 70;

/// The import job belongs to another owner
pub const FORBIDDEN: i32 = 77;
