//! Integration tests for drivemirror-gdrive
//!
//! Uses wiremock to simulate the Google Drive v3 API and verifies the
//! end-to-end behavior of `DriveRemoteStore`: folder resolution, listing,
//! upsert uploads, and delete-by-name.


mod test_files;
