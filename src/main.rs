// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 资源服务器
//!
//! 基于 Tokio 运行时的多线程资源服务器，负责投递打包工具生成的静态资源。
//! 核心功能包括：
//! - 启动时加载资源清单，清单无效时拒绝启动
//! - 按 `Accept-Encoding` 协商预压缩变体，按 ETag 处理条件请求
//! - 未被资源中间件处理的请求交给后备处理器（入口点首页或 404）
//! - 后台管理控制台（CLI 指令交互），停机时取消进行中的传输

use assetserver::{
    util::split_entrypoint_names, AssetServer, AssetServerOptions, Config, Entrypoints,
    Exception, HtmlBuilder, HttpRequestMethod, ManifestSource, Outcome, Request, Response,
};

use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, BufReader},
    net::{TcpListener, TcpStream},
    runtime::Builder,
};
use tokio_util::sync::CancellationToken;

use std::{
    net::{Ipv4Addr, SocketAddrV4},
    path::PathBuf,
    process,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Instant,
};

/// 请求头的最大长度，超过后不再继续读取
const MAX_HEAD_SIZE: usize = 8192;

/// # 程序入口点
///
/// 初始化日志与配置、预加载清单并启动主事件循环。
fn main() {
    // 1. 初始化日志系统：通过外部 YAML 配置级别与输出目的地
    if let Err(e) = log4rs::init_file("config/log4rs.yaml", Default::default()) {
        eprintln!("无法初始化日志系统：{}", e);
        process::exit(1);
    }

    // 2. 环境配置加载：从 TOML 文件读取运行参数
    let config = Config::from_toml("config/development.toml");
    info!("配置文件已载入");
    info!("www root: {}", config.www_root());

    // 3. 异步运行时定制：根据配置文件分配工作线程数
    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("无法创建异步运行时：{}", e);
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(serve(config)) {
        error!("服务器异常退出：{}", e);
        process::exit(1);
    }
}

async fn serve(config: Config) -> Result<(), Exception> {
    // 4. 清单预加载：相对路径按 www_root 解析，加载失败则拒绝启动
    let manifest_path = PathBuf::from(config.www_root()).join(config.manifest());
    info!("资源清单: {}", manifest_path.display());
    let entrypoints = Arc::new(Entrypoints::new(
        ManifestSource::File(manifest_path),
        config.url_prefix(),
    ));
    entrypoints.manifest().await?;

    let server = Arc::new(AssetServer::new(
        AssetServerOptions::from_config(&config),
        Arc::clone(&entrypoints),
        &config,
    ));
    info!(
        "资源中间件前缀：{}，完整占用前缀：{}",
        config.url_prefix(),
        config.claim_whole_prefix()
    );

    // 5. 网络层初始化：支持全地址监听或本地回环监听
    let port = config.port();
    let address = match config.local() {
        true => Ipv4Addr::new(127, 0, 0, 1),
        false => Ipv4Addr::new(0, 0, 0, 0),
    };
    info!("服务端将在{}:{}上监听Socket连接", address, port);
    let listener = TcpListener::bind(SocketAddrV4::new(address, port)).await?;
    info!("端口{}绑定完成", port);

    // 6. 生命周期管理
    // shutdown: 根取消令牌，停机时同时中止所有进行中的传输
    // active_connection: 当前并发连接数
    let shutdown = CancellationToken::new();
    let active_connection = Arc::new(AtomicUsize::new(0));

    // 7. 启动交互式管理控制台任务
    tokio::spawn(console(shutdown.clone(), Arc::clone(&active_connection)));

    let config = Arc::new(config);
    let mut id: u128 = 0;

    // 8. 主事件循环
    loop {
        let (mut stream, addr) = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("主循环接收到停机指令，正在退出...");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("接受连接失败：{}", e);
                    continue;
                }
            },
        };
        debug!("[ID{}]TCP连接已建立：{}", id, addr);

        let server = Arc::clone(&server);
        let config = Arc::clone(&config);
        let active_connection = Arc::clone(&active_connection);
        let cancel = shutdown.child_token();
        tokio::spawn(async move {
            active_connection.fetch_add(1, Ordering::SeqCst);
            handle_connection(&mut stream, id, &server, &config, &cancel).await;
            active_connection.fetch_sub(1, Ordering::SeqCst);
        });
        id += 1;
    }
    Ok(())
}

async fn console(shutdown: CancellationToken, active_connection: Arc<AtomicUsize>) {
    let mut reader = BufReader::new(tokio::io::stdin());
    let mut input = String::new();
    loop {
        input.clear();
        match reader.read_line(&mut input).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        match input.trim() {
            "stop" => {
                println!("停机指令已激活，进行中的传输将被中止...");
                shutdown.cancel();
                break;
            }
            "help" => {
                println!("== Assetserver Help ==");
                println!("stop   - 发出停机信号");
                println!("status - 查看当前服务器运行状态");
                println!("help   - 显示此帮助信息");
                println!("======================");
            }
            "status" => {
                println!("== Assetserver 状态 ===");
                println!("当前活跃连接数: {}", active_connection.load(Ordering::SeqCst));
                println!("======================");
            }
            cmd => println!("无效的命令：{}", cmd),
        }
    }
}

/// 读取请求头，直到遇到空行、连接关闭或超过长度上限
async fn read_head(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if buffer.windows(4).any(|w| w == b"\r\n\r\n") || buffer.len() >= MAX_HEAD_SIZE {
            break;
        }
    }
    Ok(buffer)
}

/// # 连接处理器
///
/// 读取并解析请求，先交给资源中间件，被放行的请求交给后备处理器，最后发送响应。
async fn handle_connection(
    stream: &mut TcpStream,
    id: u128,
    server: &AssetServer,
    config: &Config,
    cancel: &CancellationToken,
) {
    let buffer = match read_head(stream).await {
        Ok(buffer) if buffer.is_empty() => return,
        Ok(buffer) => buffer,
        Err(e) => {
            error!("[ID{}]读取TCPStream时遇到错误: {}", id, e);
            return;
        }
    };
    debug!("[ID{}]HTTP请求接收完毕", id);
    let start_time = Instant::now();

    // 1. 协议解析
    let request = match Request::try_from(&buffer, id) {
        Ok(request) => request,
        Err(e) => {
            warn!("[ID{}]解析HTTP请求失败: {}", id, e);
            let response = Response::from_exception(&e);
            if let Err(e) = server.transfer(&response, stream, cancel, id).await {
                warn!("[ID{}]错误响应发送中断，丢弃连接: {}", id, e);
            }
            return;
        }
    };

    // 2. 资源中间件，未处理的请求交给后备处理器
    let response = match server.handle(&request, id).await {
        Outcome::Handled(response) => response,
        Outcome::Declined => fallback(&request, id, server, config).await,
    };
    debug!(
        "[ID{}]HTTP响应构建完成，服务端用时{}ms。",
        id,
        start_time.elapsed().as_millis()
    );

    // 3. 访问日志
    info!(
        "[ID{}] {}, {}, {}, {}, {}, {}",
        id,
        request.version(),
        request.path(),
        request.method(),
        response.status_code(),
        response.information(),
        request.user_agent(),
    );

    // 4. 数据发送
    if let Err(e) = server.transfer(&response, stream, cancel, id).await {
        warn!("[ID{}]响应发送中断，丢弃连接: {}", id, e);
    }
}

/// 后备处理器：`/` 渲染入口点首页（若已配置），其余请求返回 404
async fn fallback(request: &Request, id: u128, server: &AssetServer, config: &Config) -> Response {
    let method = request.method();
    if request.route_path() != "/" || !method.is_get_or_head() || config.index_entrypoints().is_empty() {
        debug!("[ID{}]后备处理器：{}不存在，返回404", id, request.path());
        return Response::not_found();
    }

    let names = split_entrypoint_names(config.index_entrypoints());
    match server.entrypoints().resolve(&names).await {
        Ok(resolved) => {
            let html = HtmlBuilder::from_entrypoint("Assetserver", config.url_prefix(), &resolved)
                .body("<div id=\"app\"></div>")
                .build();
            Response::from_html(html, method == HttpRequestMethod::Head)
        }
        Err(e) => {
            error!("[ID{}]无法渲染首页入口点{}: {}", id, config.index_entrypoints(), e);
            Response::from_exception(&e)
        }
    }
}
