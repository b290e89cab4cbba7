mod process_host;
