// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

#[cfg(test)]
mod security_tests {
    //! # 安全回归测试套件
    //!
    //! 模拟常见攻击向量，验证资源中间件只会交付清单中声明、且位于存储根目录内的文件。
    //! 覆盖范围包括：
    //! - 路径遍历（请求路径与清单句柄两个方向）
    //! - 畸形报文（空字节、非 UTF-8、错误的协议版本）
    //! - 标签注入（清单内容进入 HTML 时的转义）

    use std::{fs, sync::Arc};

    use bytes::Bytes;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    use assetserver::{
        call_entrypoint, AssetServer, AssetServerOptions, AssetStorage, Entrypoints, Exception,
        ManifestSource, Outcome, PhysicalStorage, Request,
    };

    const MANIFEST: &str = r#"{
        "entrypoints": {
            "evil": { "scripts": ["x\"><script>alert(1)</script>.js"], "stylesheets": [] }
        },
        "files": {
            "app.js": {
                "contentType": "application/javascript",
                "sriHash": "sha384-app",
                "variants": { "identity": { "file": "app.js", "hash": "a", "size": 5 } }
            },
            "escape.js": {
                "contentType": "application/javascript",
                "sriHash": "sha384-escape",
                "variants": { "identity": { "file": "../secret.txt", "hash": "s", "size": 6 } }
            },
            "absolute.js": {
                "contentType": "application/javascript",
                "sriHash": "sha384-abs",
                "variants": { "identity": { "file": "/etc/passwd", "hash": "p", "size": 1 } }
            },
            "x\"><script>alert(1)</script>.js": {
                "contentType": "application/javascript",
                "sriHash": "\" onload=\"alert(2)",
                "variants": { "identity": { "file": "app.js", "hash": "a", "size": 5 } }
            }
        }
    }"#;

    /// 在临时目录中布置：`root/assets/app.js` 与根目录外的 `root/secret.txt`
    fn layout() -> (TempDir, AssetServer) {
        let dir = TempDir::new().unwrap();
        let assets = dir.path().join("assets");
        fs::create_dir(&assets).unwrap();
        fs::write(assets.join("app.js"), "hello").unwrap();
        fs::write(dir.path().join("secret.txt"), "secret").unwrap();

        let entrypoints = Arc::new(Entrypoints::new(
            ManifestSource::Embedded(Bytes::from_static(MANIFEST.as_bytes())),
            "/assets",
        ));
        let storage = Arc::new(PhysicalStorage::new(&assets, 8, 1024));
        let server = AssetServer::with_storage(AssetServerOptions::default(), entrypoints, storage);
        (dir, server)
    }

    async fn status(server: &AssetServer, raw: &str) -> u16 {
        let request = Request::try_from(raw.as_bytes(), 0).unwrap();
        match server.handle(&request, 0).await {
            Outcome::Handled(response) => response.status_code(),
            Outcome::Declined => 0,
        }
    }

    /// ## 攻击向量：请求路径遍历
    /// 子路径只作为清单键使用，不会被拼接为文件系统路径。
    #[tokio::test]
    async fn test_path_traversal_in_request() {
        let (_dir, server) = layout();
        for attack in [
            "GET /assets/../secret.txt HTTP/1.1\r\n\r\n",
            "GET /assets/..%2fsecret.txt HTTP/1.1\r\n\r\n",
            "GET /assets/%2e%2e/secret.txt HTTP/1.1\r\n\r\n",
            "GET /assets//etc/passwd HTTP/1.1\r\n\r\n",
        ] {
            assert_eq!(status(&server, attack).await, 404, "{}", attack);
        }
        assert_eq!(status(&server, "GET /assets/app.js HTTP/1.1\r\n\r\n").await, 200);
    }

    /// ## 攻击向量：清单句柄越界
    /// 被篡改的清单也无法让存储后端读取根目录之外的文件。
    #[tokio::test]
    async fn test_manifest_handle_cannot_escape_root() {
        let (_dir, server) = layout();
        assert_eq!(status(&server, "GET /assets/escape.js HTTP/1.1\r\n\r\n").await, 404);
        assert_eq!(status(&server, "GET /assets/absolute.js HTTP/1.1\r\n\r\n").await, 404);
    }

    #[tokio::test]
    async fn test_physical_storage_rejects_traversal_handles() {
        let (dir, _server) = layout();
        let storage = PhysicalStorage::new(dir.path().join("assets"), 8, 1024);
        assert!(storage.locate("../secret.txt").await.is_none());
        assert!(storage.locate("sub/../../secret.txt").await.is_none());
        assert!(storage.open("../secret.txt").await.is_err());
        assert!(storage.locate("app.js").await.is_some());
    }

    /// ## 攻击向量：大小写混淆
    /// 前缀匹配大小写不敏感，清单键查找区分大小写。
    #[tokio::test]
    async fn test_case_sensitivity() {
        let (_dir, server) = layout();
        assert_eq!(status(&server, "GET /ASSETS/app.js HTTP/1.1\r\n\r\n").await, 200);
        assert_eq!(status(&server, "GET /assets/APP.JS HTTP/1.1\r\n\r\n").await, 404);
    }

    /// ## 攻击向量：空字节与非 UTF-8 报文
    #[test]
    fn test_malformed_bytes() {
        assert_eq!(
            Request::try_from(b"GET /assets/\xff\xfe HTTP/1.1\r\n\r\n", 0).err(),
            Some(Exception::RequestIsNotUtf8)
        );
        // 末尾的空字节会被忽略
        assert!(Request::try_from(b"GET /assets/app.js HTTP/1.1\r\n\r\n\0\0\0", 0).is_ok());
    }

    /// ## 攻击向量：协议健壮性
    #[test]
    fn test_malformed_request_line() {
        for (raw, expected) in [
            ("GET /assets/app.js HTTP/9.9\r\n\r\n", Exception::UnsupportedHttpVersion),
            ("GET /assets/app.js\r\n\r\n", Exception::MalformedRequestLine),
            ("BREW /assets/app.js HTTP/1.1\r\n\r\n", Exception::MalformedRequestLine),
            ("\r\n\r\n", Exception::MalformedRequestLine),
        ] {
            let err = Request::try_from(raw.as_bytes(), 0).unwrap_err();
            assert_eq!(err, expected, "{:?}", raw);
            assert_eq!(err.status_code(), 400);
        }
    }

    /// ## 攻击向量：超长的条件请求头
    /// 大量实体标签只影响求值耗时，不会导致错误的命中。
    #[tokio::test]
    async fn test_oversized_tag_lists() {
        let (_dir, server) = layout();
        let tags = (0..2000)
            .map(|i| format!("\"t{}\"", i))
            .collect::<Vec<_>>()
            .join(", ");
        let raw = format!("GET /assets/app.js HTTP/1.1\r\nIf-None-Match: {}\r\n\r\n", tags);
        assert_eq!(status(&server, &raw).await, 200);
        let raw = format!("GET /assets/app.js HTTP/1.1\r\nIf-Match: {}\r\n\r\n", tags);
        assert_eq!(status(&server, &raw).await, 412);
    }

    /// ## 攻击向量：标签注入
    /// 清单中的文件名与 SRI 值进入 HTML 属性前必须转义。
    #[tokio::test]
    async fn test_tag_injection_is_escaped() {
        let (_dir, server) = layout();
        let html = call_entrypoint(server.entrypoints(), "evil").await.unwrap();
        assert!(html.contains("&quot;"));
        assert!(!html.contains("\"><script>"));
        assert!(!html.contains("\" onload=\""));
    }

    /// ## 传输：磁盘上的内容原样交付
    #[tokio::test]
    async fn test_physical_transfer() {
        let (_dir, server) = layout();
        let request = Request::try_from(b"GET /assets/app.js HTTP/1.1\r\n\r\n", 0).unwrap();
        let response = match server.handle(&request, 0).await {
            Outcome::Handled(response) => response,
            Outcome::Declined => panic!("declined"),
        };
        let mut sink = Vec::new();
        let sent = server
            .transfer(&response, &mut sink, &CancellationToken::new(), 0)
            .await
            .unwrap();
        assert_eq!(sent, 5);
        assert!(sink.ends_with(b"\r\n\r\nhello"));
    }
}
