//! Session lifecycle and single-entry operation tests

use rstest::*;

use crate::test_support::{write_file, FaultyConnector, Faults, Sandbox};
use crate::{DirectorySync, ErrorPolicy, LocalConnector, SyncError, SyncOptions};

#[fixture]
fn sandbox() -> Sandbox {
    Sandbox::new()
}

mod lifecycle_tests {
    use super::*;
    use test_case::test_case;

    #[test_case(ErrorPolicy::Strict ; "strict")]
    #[test_case(ErrorPolicy::Lenient ; "lenient")]
    #[tokio::test]
    async fn test_operations_require_login(policy: ErrorPolicy) {
        let sandbox = Sandbox::new();
        let connector = FaultyConnector::new(sandbox.remote.path(), Faults::default());
        let mut sync = DirectorySync::with_options(connector, SyncOptions { error_policy: policy });

        assert!(matches!(sync.is_file("/a").await, Err(SyncError::NotConnected)));
        assert!(matches!(sync.delete("/a").await, Err(SyncError::NotConnected)));
        assert!(matches!(sync.rename("/a", "/b").await, Err(SyncError::NotConnected)));
        assert!(matches!(sync.mkdir("/a").await, Err(SyncError::NotConnected)));
        assert!(matches!(sync.touch("/a", "x").await, Err(SyncError::NotConnected)));
        assert!(matches!(sync.upload(sandbox.local_path("a"), "/a").await, Err(SyncError::NotConnected)));
        assert!(matches!(sync.download("/a", sandbox.local_path("a")).await, Err(SyncError::NotConnected)));
        assert!(matches!(sync.download_contents("/a").await, Err(SyncError::NotConnected)));
        assert!(matches!(sync.scan_dir("/").await, Err(SyncError::NotConnected)));
        assert!(matches!(sync.all_files("/").await, Err(SyncError::NotConnected)));
        assert!(matches!(sync.pwd().await, Err(SyncError::NotConnected)));
        assert!(matches!(sync.rmdir("/a").await, Err(SyncError::NotConnected)));
        assert!(matches!(
            sync.upload_dir(sandbox.local.path(), "/").await,
            Err(SyncError::NotConnected)
        ));
        assert!(matches!(
            sync.download_dir("/", sandbox.local.path()).await,
            Err(SyncError::NotConnected)
        ));
    }

    #[test_case("localhost", "wrong" ; "rejected credentials")]
    #[test_case("unreachable", "secret" ; "unreachable host")]
    #[tokio::test]
    async fn test_strict_login_failure(host: &str, password: &str) {
        let sandbox = Sandbox::new();
        let connector = FaultyConnector::new(sandbox.remote.path(), Faults::default());
        let mut sync = DirectorySync::new(connector);

        let err = sync.login(host, "tester", password, 2222).await.err().unwrap();
        assert!(matches!(err, SyncError::LoginFailed { ref target, .. } if target == &format!("{host}:2222")));
        assert!(!sync.is_connected());
    }

    #[test_case("localhost", "wrong" ; "rejected credentials")]
    #[test_case("unreachable", "secret" ; "unreachable host")]
    #[tokio::test]
    async fn test_lenient_login_failure(host: &str, password: &str) {
        let sandbox = Sandbox::new();
        let connector = FaultyConnector::new(sandbox.remote.path(), Faults::default());
        let mut sync = DirectorySync::with_options(connector, SyncOptions::lenient());

        assert!(!sync.login(host, "tester", password, 22).await.unwrap().is_connected());
        assert!(matches!(sync.scan_dir("/").await, Err(SyncError::NotConnected)));
    }

    #[rstest]
    #[tokio::test]
    async fn test_test_reports_authentication(sandbox: Sandbox) {
        let connector = LocalConnector::new(sandbox.remote.path()).with_credentials("deploy", "s3cret");
        let mut sync = DirectorySync::with_options(connector, SyncOptions::lenient());

        assert!(!sync.test("localhost", "deploy", "nope", 22).await.unwrap());
        assert!(sync.test("localhost", "deploy", "s3cret", 22).await.unwrap());
        assert!(sync.is_connected());
    }

    #[rstest]
    #[tokio::test]
    async fn test_failed_relogin_drops_previous_session(sandbox: Sandbox) {
        let connector = FaultyConnector::new(sandbox.remote.path(), Faults::default());
        let mut sync = DirectorySync::with_options(connector, SyncOptions::lenient());

        sync.login("localhost", "tester", "secret", 22).await.unwrap();
        assert!(sync.is_connected());

        sync.login("localhost", "tester", "wrong", 22).await.unwrap();
        assert!(!sync.is_connected());
    }

    #[rstest]
    #[tokio::test]
    async fn test_logout(sandbox: Sandbox) {
        let mut sync = sandbox.connect(Faults::default(), SyncOptions::strict()).await;
        sync.logout().await;
        assert!(!sync.is_connected());
        assert!(matches!(sync.pwd().await, Err(SyncError::NotConnected)));
    }
}

mod single_entry_tests {
    use super::*;

    #[rstest]
    #[tokio::test]
    async fn test_is_file(sandbox: Sandbox) {
        write_file(sandbox.remote.path(), "dir/file.txt", b"x");
        let mut sync = sandbox.connect(Faults::default(), SyncOptions::strict()).await;

        assert!(sync.is_file("/dir/file.txt").await.unwrap());
        assert!(!sync.is_file("/dir").await.unwrap());
        assert!(!sync.is_file("/missing").await.unwrap());
    }

    #[rstest]
    #[tokio::test]
    async fn test_delete_only_removes_regular_files(sandbox: Sandbox) {
        write_file(sandbox.remote.path(), "dir/file.txt", b"x");
        let mut sync = sandbox.connect(Faults::default(), SyncOptions::strict()).await;

        assert!(!sync.delete("/dir").await.unwrap());
        assert!(!sync.delete("/missing").await.unwrap());
        assert!(sync.delete("/dir/file.txt").await.unwrap());
        assert!(!sandbox.remote_path("dir/file.txt").exists());
        assert!(sandbox.remote_path("dir").is_dir());
    }

    #[rstest]
    #[tokio::test]
    async fn test_rename(sandbox: Sandbox) {
        write_file(sandbox.remote.path(), "old.txt", b"x");
        let mut sync = sandbox.connect(Faults::default(), SyncOptions::strict()).await;

        assert!(sync.rename("/old.txt", "/new.txt").await.unwrap());
        assert!(sandbox.remote_path("new.txt").is_file());
        assert!(!sync.rename("/old.txt", "/other.txt").await.unwrap());
    }

    #[rstest]
    #[tokio::test]
    async fn test_mkdir_creates_parents(sandbox: Sandbox) {
        let mut sync = sandbox.connect(Faults::default(), SyncOptions::strict()).await;

        assert!(sync.mkdir("/a/b/c").await.unwrap());
        assert!(sandbox.remote_path("a/b/c").is_dir());
        assert!(!sync.mkdir("/a/b/c").await.unwrap());
    }

    #[rstest]
    #[tokio::test]
    async fn test_touch_then_download_contents(sandbox: Sandbox) {
        let mut sync = sandbox.connect(Faults::default(), SyncOptions::strict()).await;

        assert!(sync.touch("/greeting.txt", "hello").await.unwrap());
        assert_eq!(
            sync.download_contents("/greeting.txt").await.unwrap().as_deref(),
            Some(&b"hello"[..])
        );

        assert!(sync.touch("/empty.txt", "").await.unwrap());
        assert_eq!(sync.download_contents("/empty.txt").await.unwrap(), Some(Vec::new()));
    }

    #[rstest]
    #[tokio::test]
    async fn test_download_contents_of_missing_file(sandbox: Sandbox) {
        let mut sync = sandbox.connect(Faults::default(), SyncOptions::strict()).await;
        assert!(sync.download_contents("/missing").await.unwrap().is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn test_refused_touch(sandbox: Sandbox) {
        let mut sync = sandbox
            .connect(Faults::default().refuse("locked.txt"), SyncOptions::strict())
            .await;
        assert!(!sync.touch("/locked.txt", "data").await.unwrap());
        assert!(!sandbox.remote_path("locked.txt").exists());
    }

    #[rstest]
    #[tokio::test]
    async fn test_upload_and_download_single_file(sandbox: Sandbox) {
        write_file(sandbox.local.path(), "report.csv", b"a,b\n1,2\n");
        let mut sync = sandbox.connect(Faults::default(), SyncOptions::strict()).await;

        assert!(sync.upload(sandbox.local_path("report.csv"), "/report.csv").await.unwrap());
        assert!(sync.download("/report.csv", sandbox.local_path("copy.csv")).await.unwrap());
        assert_eq!(std::fs::read(sandbox.local_path("copy.csv")).unwrap(), b"a,b\n1,2\n");

        assert!(!sync.download("/absent.csv", sandbox.local_path("x.csv")).await.unwrap());
        assert!(!sync.upload(sandbox.local_path("absent.csv"), "/x.csv").await.unwrap());
    }

    #[rstest]
    #[tokio::test]
    async fn test_scan_dir(sandbox: Sandbox) {
        std::fs::create_dir(sandbox.remote_path("empty")).unwrap();
        write_file(sandbox.remote.path(), "one/a", b"");
        let mut sync = sandbox.connect(Faults::default(), SyncOptions::strict()).await;

        let empty = sync.scan_dir("/empty").await.unwrap();
        let missing = sync.scan_dir("/missing").await.unwrap();
        let one = sync.scan_dir("/one").await.unwrap();

        assert!(empty.is_empty());
        assert_eq!(empty, missing);
        assert_eq!(one, vec!["a".to_string()]);
        assert_ne!(one, empty);
    }

    #[rstest]
    #[tokio::test]
    async fn test_pwd(sandbox: Sandbox) {
        let mut sync = sandbox.connect(Faults::default(), SyncOptions::strict()).await;
        assert_eq!(sync.pwd().await.unwrap(), "/");
    }
}

mod policy_tests {
    use super::*;

    #[test_log::test(tokio::test)]
    async fn test_strict_transport_fault() {
        let sandbox = Sandbox::new();
        let mut sync = sandbox
            .connect(Faults::default().disconnect("flaky.txt"), SyncOptions::strict())
            .await;

        let err = sync.is_file("/flaky.txt").await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::FileOperationFailed { operation: "is_file", ref path, .. } if path == "/flaky.txt"
        ));
        assert!(!sync.is_connected());
    }

    #[test_log::test(tokio::test)]
    async fn test_lenient_transport_fault() {
        let sandbox = Sandbox::new();
        let mut sync = sandbox
            .connect(Faults::default().disconnect("flaky"), SyncOptions::lenient())
            .await;

        assert!(sync.scan_dir("/flaky").await.unwrap().is_empty());
        assert!(!sync.is_connected());
        assert!(matches!(sync.scan_dir("/").await, Err(SyncError::NotConnected)));
    }
}
